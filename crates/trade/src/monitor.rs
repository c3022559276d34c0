use futures::StreamExt;
use rust_decimal::Decimal;
use shouban_core::broker::entity::OrderSide;
use shouban_core::broker::port::BrokerPort;
use shouban_core::common::Board;
use shouban_core::config::StrategyParams;
use shouban_core::market::entity::TickSnapshot;
use shouban_core::market::port::MarketDataPort;
use shouban_core::notify::port::Notifier;
use shouban_core::store::port::CandidateStore;
use shouban_select::limit::is_limit_up_now;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 订阅列表刷新周期
const RESUBSCRIBE_INTERVAL: Duration = Duration::from_secs(60);
/// 全量持仓兜底巡检周期
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);
/// 订阅建立失败后的退避
const SUBSCRIBE_BACKOFF: Duration = Duration::from_secs(5);

/// # Summary
/// 持仓监控器：实时行情驱动的止盈止损，辅以固定周期的全量巡检。
///
/// 订阅集合 = 当日候选 ∪ 当前持仓，每 60 秒及持仓变动后刷新。
///
/// # Invariants
/// - 止损优先于止盈判定；两者在实际数值上互斥。
/// - 达到止盈线但标的当前封板时继续持有（封板意味着仍在上攻）。
/// - 持仓查询失败与空持仓严格区分：断连期间绝不触发任何卖出。
pub struct PositionMonitor {
    broker: Arc<dyn BrokerPort>,
    market: Arc<dyn MarketDataPort>,
    candidates: Arc<dyn CandidateStore>,
    notifier: Option<Arc<dyn Notifier>>,
    params: StrategyParams,
}

impl PositionMonitor {
    pub fn new(
        broker: Arc<dyn BrokerPort>,
        market: Arc<dyn MarketDataPort>,
        candidates: Arc<dyn CandidateStore>,
        notifier: Option<Arc<dyn Notifier>>,
        params: StrategyParams,
    ) -> Self {
        Self {
            broker,
            market,
            candidates,
            notifier,
            params,
        }
    }

    /// # Summary
    /// 监控主循环：订阅行情流并消费，直至收到关停信号。
    ///
    /// # Logic
    /// 1. 计算期望订阅集合并建立行情流。
    /// 2. 行情事件即时判定；1 秒定时器做全量兜底巡检。
    /// 3. 到达刷新周期或流中断时重建订阅。
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!("position monitor started");
        'outer: loop {
            if *cancel.borrow() {
                break;
            }

            let codes = self.desired_subscriptions().await;
            if codes.is_empty() {
                debug!("nothing to monitor, idling");
            }
            let mut stream = match self.market.subscribe_ticks(&codes).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("tick subscription failed: {}, retrying in {:?}", e, SUBSCRIBE_BACKOFF);
                    tokio::select! {
                        _ = cancel.changed() => {}
                        _ = tokio::time::sleep(SUBSCRIBE_BACKOFF) => {}
                    }
                    continue;
                }
            };
            info!("monitoring {} instruments", codes.len());

            let resub_at = tokio::time::Instant::now() + RESUBSCRIBE_INTERVAL;
            let mut sweep_timer = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel.changed() => {
                        if *cancel.borrow() {
                            break 'outer;
                        }
                    }
                    _ = tokio::time::sleep_until(resub_at) => break,
                    maybe = stream.next() => match maybe {
                        Some((code, tick)) => self.check_tick(&code, &tick).await,
                        None => {
                            warn!("tick stream ended, resubscribing");
                            break;
                        }
                    },
                    _ = sweep_timer.tick() => self.sweep().await,
                }
            }
        }
        info!("position monitor stopped");
    }

    /// # Summary
    /// 单标的止盈止损判定。
    ///
    /// # Logic
    /// 1. 查该标的持仓；无可用持仓或成本无效直接返回。
    /// 2. 收益率 = (现价 - 持仓均价) / 持仓均价。
    /// 3. 触及止损线：无条件以现价限价卖出全部可用数量。
    /// 4. 触及止盈线：当前封板则持有，否则卖出。
    pub async fn check_tick(&self, code: &str, tick: &TickSnapshot) {
        if tick.last_price <= 0.0 {
            return;
        }

        let position = match self.broker.position(code).await {
            Ok(Some(p)) => p,
            Ok(None) => return,
            Err(e) => {
                // 断连或查询故障：不可当作无持仓处理
                warn!("{} position query failed, check skipped: {}", code, e);
                return;
            }
        };
        if position.usable_volume <= Decimal::ZERO || position.avg_cost <= Decimal::ZERO {
            return;
        }

        let price = Decimal::try_from(tick.last_price).unwrap_or(Decimal::ZERO);
        if price <= Decimal::ZERO {
            return;
        }
        let profit_rate = (price - position.avg_cost) / position.avg_cost;
        let stop_loss = Decimal::try_from(self.params.stop_loss).unwrap_or(Decimal::ZERO);
        let stop_profit = Decimal::try_from(self.params.stop_profit).unwrap_or(Decimal::MAX);

        if profit_rate <= stop_loss {
            info!("{} stop-loss triggered at {:.2}%", code, profit_rate * Decimal::ONE_HUNDRED);
            self.sell(code, price, position.usable_volume, "止损卖出").await;
            return;
        }

        if profit_rate >= stop_profit {
            if is_limit_up_now(Board::infer(code), tick, &self.params) {
                info!(
                    "{} hit stop-profit at {:.2}% but is sealed at limit, holding",
                    code,
                    profit_rate * Decimal::ONE_HUNDRED
                );
                return;
            }
            info!("{} stop-profit triggered at {:.2}%", code, profit_rate * Decimal::ONE_HUNDRED);
            self.sell(code, price, position.usable_volume, "止盈卖出").await;
        }
    }

    /// # Summary
    /// 全量持仓兜底巡检：为订阅流未覆盖或静默的标的补位。
    pub async fn sweep(&self) {
        let positions = match self.broker.positions().await {
            Ok(positions) => positions,
            Err(e) => {
                // 查询失败 != 空持仓，跳过本轮
                warn!("positions query failed, sweep skipped: {}", e);
                return;
            }
        };

        for position in positions {
            if position.usable_volume <= Decimal::ZERO {
                continue;
            }
            match self.market.tick(&position.code).await {
                Ok(tick) => self.check_tick(&position.code, &tick).await,
                Err(e) => debug!("{} tick unavailable during sweep: {}", position.code, e),
            }
        }
    }

    /// 期望订阅集合：当日候选 ∪ 当前持仓
    async fn desired_subscriptions(&self) -> Vec<String> {
        let mut desired = BTreeSet::new();

        match self.candidates.load_latest().await {
            Ok(Some(list)) => desired.extend(list.candidates),
            Ok(None) => {}
            Err(e) => warn!("candidate list unreadable: {}", e),
        }

        match self.broker.positions().await {
            Ok(positions) => {
                desired.extend(
                    positions
                        .into_iter()
                        .filter(|p| p.volume > Decimal::ZERO)
                        .map(|p| p.code),
                );
            }
            Err(e) => warn!("positions unavailable for subscription refresh: {}", e),
        }

        desired.into_iter().collect()
    }

    async fn sell(&self, code: &str, price: Decimal, volume: Decimal, reason: &str) {
        match self
            .broker
            .submit_limit_order(code, OrderSide::Sell, price, volume, reason)
            .await
        {
            Ok(ack) => {
                info!("{} sell order accepted ({}), id {}", code, reason, ack.order_id);
                if let Some(notifier) = &self.notifier
                    && let Err(e) = notifier
                        .notify(reason, &format!("{} {} 股 @ {}", code, volume, price))
                        .await
                {
                    warn!("sell notification failed: {}", e);
                }
            }
            Err(e) => warn!("{} sell order failed ({}): {}", code, reason, e),
        }
    }
}
