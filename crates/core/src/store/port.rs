use super::error::StoreError;
use crate::strategy::entity::CandidateList;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 挂单台账的单条记录：某标的在某个日历日已经成功提交过委托。
///
/// # Invariants
/// - 同一 (标的, 日历日) 至多一条记录。
/// - 记录只在拿到券商受理回执之后写入，绝不在提交前预写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    // 写入时刻（Unix 秒）
    pub timestamp: i64,
    // 日历日，格式 YYYYMMDD
    pub date: String,
}

/// # Summary
/// 候选清单存储端口。每个交易日写入一份原子快照，
/// 由夜间挂单与晨间校验两个独立消费方按各自节奏重读。
///
/// # Invariants
/// - `save` 必须整文件原子写入（先确保目录存在，再一次性落盘）。
/// - 写入后清单只读，当日不做增量修改。
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// 持久化当日候选清单
    async fn save(&self, list: &CandidateList) -> Result<(), StoreError>;

    /// # Summary
    /// 读取最近一次持久化的候选清单。
    ///
    /// # Returns
    /// 文件缺失返回 `Ok(None)`；损坏或 I/O 失败返回 `Err`。
    async fn load_latest(&self) -> Result<Option<CandidateList>, StoreError>;
}

/// # Summary
/// 挂单台账端口——跨进程重启的幂等防线。
/// 券商委托簿才是最终真相（由晨间校验对账），
/// 台账的职责只是在真相可确认之前拦住重复的提交尝试。
///
/// # Invariants
/// - 每次变更后立即回写持久化介质（write-through），正确性优先于吞吐。
/// - `mark_placed` 只能在委托提交成功回执之后调用。
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// # Summary
    /// 查询某标的在指定日历日是否已挂过单。
    ///
    /// # Arguments
    /// * `code`: 标的代码。
    /// * `date`: 日历日，格式 YYYYMMDD。
    async fn already_placed(&self, code: &str, date: &str) -> Result<bool, StoreError>;

    /// # Summary
    /// 记录某标的已成功挂单并立即落盘。
    ///
    /// # Arguments
    /// * `code`: 标的代码。
    /// * `now`: 写入时刻（由调用方时钟提供，保证可测试）。
    async fn mark_placed(&self, code: &str, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// # Summary
    /// 清理过期台账记录并落盘。
    ///
    /// # Arguments
    /// * `now`: 当前时刻。
    /// * `max_age_days`: 保留天数，早于该窗口的记录删除。
    ///
    /// # Returns
    /// 被移除的记录数。
    async fn prune(&self, now: DateTime<Utc>, max_age_days: i64) -> Result<usize, StoreError>;

    /// 台账当前记录数
    async fn len(&self) -> usize;
}
