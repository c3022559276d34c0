use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 当日选股结果的原子快照。
/// 选股任务收盘后生成一次，次日被新快照整体取代；
/// 夜间挂单与晨间校验只读消费，从不做盘中增量修改。
///
/// # Invariants
/// - `count` 恒等于 `candidates.len()`。
/// - `candidates` 的顺序即入选顺序，持久化往返必须保序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateList {
    // 选股所属日历日
    pub date: NaiveDate,
    // 入选标的代码，按入选顺序排列
    pub candidates: Vec<String>,
    // 生成时刻（Unix 秒）
    pub timestamp: i64,
    // 入选数量
    pub count: usize,
}

impl CandidateList {
    /// # Logic
    /// 构造快照并同步冗余的 `count` 字段。
    pub fn new(date: NaiveDate, candidates: Vec<String>, timestamp: i64) -> Self {
        let count = candidates.len();
        Self {
            date,
            candidates,
            timestamp,
            count,
        }
    }

    /// 清单是否包含指定标的
    pub fn contains(&self, code: &str) -> bool {
        self.candidates.iter().any(|c| c == code)
    }
}

/// # Summary
/// 一轮选股流程的统计汇总，用于日志与通知。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionReport {
    // 基础过滤后进入扫描的标的数
    pub scanned: usize,
    // 首板初筛通过数
    pub first_board: usize,
    // 回撤检查剔除数
    pub rejected_drawdown: usize,
    // 封单检查剔除数
    pub rejected_seal: usize,
    // 最终入选数
    pub selected: usize,
}
