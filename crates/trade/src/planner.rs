use crate::alloc::{non_candidate_value, per_stock_budget, usable_cash};
use crate::orders::{SubmitStats, submit_limit_up_buys};
use crate::TaskError;
use rust_decimal::Decimal;
use shouban_core::broker::port::BrokerPort;
use shouban_core::common::time::Clock;
use shouban_core::config::StrategyParams;
use shouban_core::market::port::MarketDataPort;
use shouban_core::store::port::OrderLedger;
use shouban_core::strategy::entity::CandidateList;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// # Summary
/// 夜间挂单计划器：两阶段下单设计的乐观阶段。
///
/// 收盘后为当日候选按次日涨停价挂隔夜买单；本阶段单轮执行、
/// 内部无重试循环，失败的标的留给次日晨间校验以持仓真相纠正。
///
/// # Invariants
/// - 预留安全垫与手续费后可用资金非正时整轮中止，不下任何部分单。
/// - 重复提交由挂单台账结构性拦截，而非错误处理。
pub struct OvernightPlanner {
    broker: Arc<dyn BrokerPort>,
    market: Arc<dyn MarketDataPort>,
    ledger: Arc<dyn OrderLedger>,
    clock: Arc<dyn Clock>,
    params: StrategyParams,
}

impl OvernightPlanner {
    pub fn new(
        broker: Arc<dyn BrokerPort>,
        market: Arc<dyn MarketDataPort>,
        ledger: Arc<dyn OrderLedger>,
        clock: Arc<dyn Clock>,
        params: StrategyParams,
    ) -> Self {
        Self {
            broker,
            market,
            ledger,
            clock,
            params,
        }
    }

    /// # Summary
    /// 执行一轮夜间挂单。
    ///
    /// # Logic
    /// 1. 查可用资金与全量持仓。
    /// 2. 扣除非候选持仓占用，再预留安全垫与手续费。
    /// 3. 等权均分到每个候选。
    /// 4. 逐标的走台账闸门 -> 涨停价 -> 整手数量 -> 提交 -> 记账。
    ///
    /// # Returns
    /// 成功 / 失败 / 跳过 计数；资金不足返回 `InsufficientFunds`。
    pub async fn plan_and_submit(
        &self,
        candidates: &CandidateList,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SubmitStats, TaskError> {
        info!("overnight planning started for {}", candidates.date);
        if candidates.candidates.is_empty() {
            info!("candidate list empty, nothing to place");
            return Ok(SubmitStats::default());
        }

        let asset = self.broker.asset().await?;
        let positions = self.broker.positions().await?;
        let held_value = non_candidate_value(&positions, candidates);
        info!(
            "available cash {:.2}, non-candidate holdings {:.2}",
            asset.cash, held_value
        );

        let usable = usable_cash(
            asset.cash,
            held_value,
            self.params.safety_margin,
            self.params.transaction_cost_rate,
        );
        if usable <= Decimal::ZERO {
            warn!("no usable cash after reserves: {:.2}, aborting pass", usable);
            return Err(TaskError::InsufficientFunds);
        }

        let per_stock = per_stock_budget(usable, candidates.candidates.len());
        info!(
            "usable cash {:.2}, per-candidate budget {:.2} across {}",
            usable,
            per_stock,
            candidates.candidates.len()
        );

        let date = shouban_core::common::trade_date(self.clock.now());
        let stats = submit_limit_up_buys(
            &self.broker,
            &self.market,
            &self.ledger,
            &self.clock,
            &candidates.candidates,
            per_stock,
            &date,
            "夜间挂单",
            cancel,
        )
        .await?;

        info!(
            "overnight planning finished: {} submitted, {} failed, {} skipped",
            stats.submitted, stats.failed, stats.skipped
        );
        Ok(stats)
    }
}
