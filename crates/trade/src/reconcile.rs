use crate::alloc::{non_candidate_value, per_stock_budget, usable_cash};
use crate::orders::submit_limit_up_buys;
use crate::TaskError;
use rust_decimal::Decimal;
use shouban_core::broker::port::BrokerPort;
use shouban_core::common::time::Clock;
use shouban_core::config::StrategyParams;
use shouban_core::market::port::MarketDataPort;
use shouban_core::store::port::OrderLedger;
use shouban_core::strategy::entity::CandidateList;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// 晨间校验的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    // 隔夜已成交的候选数
    pub filled: usize,
    // 本轮补充提交成功数
    pub resubmitted: usize,
    // 补充提交失败数
    pub failed: usize,
    // 台账命中跳过数
    pub skipped: usize,
}

/// # Summary
/// 晨间校验：两阶段下单设计的纠正阶段。
///
/// 以券商持仓为最终真相，找出隔夜未成交的候选，
/// 对未成交子集**重新**做一轮等权分配后补充挂单——
/// 是全新计算，不是隔夜计划的延续。
///
/// # Invariants
/// - 已成交候选被持仓集合天然排除，不会重复买入；
///   台账进一步拦住"隔夜已提交但尚未成交"的候选。
/// - 券商不可用只令本次调用失败返回，由调度器下次触发重试。
pub struct MorningReconciler {
    broker: Arc<dyn BrokerPort>,
    market: Arc<dyn MarketDataPort>,
    ledger: Arc<dyn OrderLedger>,
    clock: Arc<dyn Clock>,
    params: StrategyParams,
}

impl MorningReconciler {
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
    /// 执行一轮晨间校验与补单。
    ///
    /// # Logic
    /// 1. 查全量持仓，得出"未成交候选"子集。
    /// 2. 子集为空 -> 全部成交，直接返回。
    /// 3. 对子集重算可用资金与等权预算（口径与夜间一致）。
    /// 4. 复用同一条提交路径补单，同一台账闸门去重。
    pub async fn reconcile(
        &self,
        candidates: &CandidateList,
        cancel: &watch::Receiver<bool>,
    ) -> Result<ReconcileOutcome, TaskError> {
        info!("morning reconciliation started for {}", candidates.date);
        if candidates.candidates.is_empty() {
            info!("candidate list empty, nothing to reconcile");
            return Ok(ReconcileOutcome::default());
        }

        let positions = self.broker.positions().await?;
        let held: HashSet<&str> = positions
            .iter()
            .filter(|p| p.volume > Decimal::ZERO)
            .map(|p| p.code.as_str())
            .collect();

        let unfilled: Vec<String> = candidates
            .candidates
            .iter()
            .filter(|c| !held.contains(c.as_str()))
            .cloned()
            .collect();
        let filled = candidates.candidates.len() - unfilled.len();
        info!(
            "{} of {} candidates filled overnight, {} unfilled",
            filled,
            candidates.candidates.len(),
            unfilled.len()
        );

        if unfilled.is_empty() {
            info!("all candidates filled, no resubmission needed");
            return Ok(ReconcileOutcome {
                filled,
                ..ReconcileOutcome::default()
            });
        }

        let asset = self.broker.asset().await?;
        let held_value = non_candidate_value(&positions, candidates);
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

        // 只对未成交子集重新等权分配
        let per_stock = per_stock_budget(usable, unfilled.len());
        info!(
            "resubmission budget {:.2} per candidate across {}",
            per_stock,
            unfilled.len()
        );

        let date = shouban_core::common::trade_date(self.clock.now());
        let stats = submit_limit_up_buys(
            &self.broker,
            &self.market,
            &self.ledger,
            &self.clock,
            &unfilled,
            per_stock,
            &date,
            "补充挂单",
            cancel,
        )
        .await?;

        let outcome = ReconcileOutcome {
            filled,
            resubmitted: stats.submitted,
            failed: stats.failed,
            skipped: stats.skipped,
        };
        info!(
            "morning reconciliation finished: {} filled, {} resubmitted, {} failed, {} skipped",
            outcome.filled, outcome.resubmitted, outcome.failed, outcome.skipped
        );
        Ok(outcome)
    }
}
