use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rust_decimal::Decimal;
use shouban_core::broker::entity::{AccountAsset, OrderAck, OrderSide, Position};
use shouban_core::broker::port::{BrokerPort, TradeError};
use shouban_core::market::entity::{DayBar, TickSnapshot};
use shouban_core::market::error::MarketError;
use shouban_core::market::port::{MarketDataPort, TickStream};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

/// # Summary
/// 确定性合成行情源：按代码种子生成随机游走日线。
///
/// 用于演练模式与离线联调。同一代码每次生成完全相同的序列，
/// 保证演练结果可复现；绝不作为实盘数据的静默降级。
pub struct SyntheticMarketData {
    universe: Vec<String>,
}

impl SyntheticMarketData {
    /// 默认池：50 只沪市主板 + 50 只深市主板
    pub fn new() -> Self {
        let mut universe = Vec::new();
        for i in 0..50 {
            universe.push(format!("{:06}.SH", 600000 + i));
        }
        for i in 0..50 {
            universe.push(format!("{:06}.SZ", 1 + i));
        }
        Self { universe }
    }

    pub fn with_universe(universe: Vec<String>) -> Self {
        Self { universe }
    }

    fn seed_of(code: &str) -> u64 {
        // FNV-1a，保证跨进程稳定
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for b in code.bytes() {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }

    /// 为单个代码生成 `count` 根随机游走日线
    fn generate_bars(code: &str, count: usize) -> Vec<DayBar> {
        let mut rng = StdRng::seed_from_u64(Self::seed_of(code));
        let mut price = rng.random_range(10.0..100.0);
        let mut bars = Vec::with_capacity(count);

        for _ in 0..count {
            let pre_close = price;
            let change: f64 = rng.random_range(-0.05..0.05);
            let close = (pre_close * (1.0 + change) * 100.0).round() / 100.0;
            let open = (pre_close * (1.0 + rng.random_range(-0.02..0.02)) * 100.0).round() / 100.0;
            let high = close.max(open) * (1.0 + rng.random_range(0.0..0.02));
            let low = close.min(open) * (1.0 - rng.random_range(0.0..0.02));
            let amount = rng.random_range(5.0e7..5.0e8);

            bars.push(DayBar {
                open,
                high: (high * 100.0).round() / 100.0,
                low: (low * 100.0).round() / 100.0,
                close,
                pre_close,
                amount,
            });
            price = close;
        }
        bars
    }
}

impl Default for SyntheticMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataPort for SyntheticMarketData {
    async fn universe(&self, _sector: &str) -> Result<Vec<String>, MarketError> {
        info!("synthetic universe: {} instruments", self.universe.len());
        Ok(self.universe.clone())
    }

    async fn instrument_names(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, String>, MarketError> {
        Ok(codes
            .iter()
            .map(|c| (c.clone(), format!("模拟股票{}", &c[..6])))
            .collect())
    }

    async fn suspended(&self, _codes: &[String]) -> Result<HashSet<String>, MarketError> {
        Ok(HashSet::new())
    }

    async fn daily_bars(&self, code: &str, count: usize) -> Result<Vec<DayBar>, MarketError> {
        Ok(Self::generate_bars(code, count))
    }

    async fn last_close(&self, code: &str) -> Result<f64, MarketError> {
        Self::generate_bars(code, 1)
            .last()
            .map(|b| b.close)
            .ok_or(MarketError::NotFound)
    }

    async fn tick(&self, code: &str) -> Result<TickSnapshot, MarketError> {
        let bar = Self::generate_bars(code, 64)
            .pop()
            .ok_or(MarketError::NotFound)?;
        Ok(TickSnapshot {
            last_price: bar.close,
            high: bar.high,
            pre_close: bar.pre_close,
            bid1_price: bar.close,
            bid1_volume: 2000.0,
            turnover: bar.amount,
            float_market_cap: Some(5.0e9),
        })
    }

    async fn subscribe_ticks(&self, codes: &[String]) -> Result<TickStream, MarketError> {
        let (tx, rx) = tokio::sync::mpsc::channel(256);
        let codes: Vec<String> = codes.to_vec();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                for code in &codes {
                    let Some(bar) = Self::generate_bars(code, 64).pop() else {
                        continue;
                    };
                    let snapshot = TickSnapshot {
                        last_price: bar.close,
                        high: bar.high,
                        pre_close: bar.pre_close,
                        bid1_price: bar.close,
                        bid1_volume: 2000.0,
                        turnover: bar.amount,
                        float_market_cap: Some(5.0e9),
                    };
                    if tx.send((code.clone(), snapshot)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

struct SyntheticAccount {
    cash: Decimal,
    positions: HashMap<String, Position>,
    next_order_id: i64,
}

/// # Summary
/// 纸面券商：委托即时全额成交并回写内存账户。
///
/// 演练模式下配合合成行情闭环运行；
/// 成交模型刻意简化（限价即成交价，无部分成交）。
pub struct SyntheticBroker {
    account: Mutex<SyntheticAccount>,
}

impl SyntheticBroker {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            account: Mutex::new(SyntheticAccount {
                cash: initial_cash,
                positions: HashMap::new(),
                next_order_id: 1,
            }),
        }
    }
}

#[async_trait]
impl BrokerPort for SyntheticBroker {
    /// # Logic
    /// 1. 买单：校验资金后扣款，按成交价合并持仓均价。
    /// 2. 卖单：校验可用数量后减仓回款。
    /// 3. 返回自增委托号。
    async fn submit_limit_order(
        &self,
        code: &str,
        side: OrderSide,
        price: Decimal,
        volume: Decimal,
        remark: &str,
    ) -> Result<OrderAck, TradeError> {
        let mut account = self.account.lock().await;
        let notional = price * volume;

        match side {
            OrderSide::Buy => {
                if account.cash < notional {
                    return Err(TradeError::OrderRejected(format!(
                        "insufficient cash: need {}, have {}",
                        notional, account.cash
                    )));
                }
                account.cash -= notional;
                let entry = account
                    .positions
                    .entry(code.to_string())
                    .or_insert_with(|| Position {
                        code: code.to_string(),
                        volume: Decimal::ZERO,
                        usable_volume: Decimal::ZERO,
                        avg_cost: Decimal::ZERO,
                    });
                let total_cost = entry.avg_cost * entry.volume + notional;
                entry.volume += volume;
                entry.usable_volume += volume;
                entry.avg_cost = total_cost / entry.volume;
            }
            OrderSide::Sell => {
                let emptied = {
                    let entry = account
                        .positions
                        .get_mut(code)
                        .ok_or_else(|| TradeError::OrderRejected("no position".into()))?;
                    if entry.usable_volume < volume {
                        return Err(TradeError::OrderRejected("insufficient volume".into()));
                    }
                    entry.volume -= volume;
                    entry.usable_volume -= volume;
                    entry.volume.is_zero()
                };
                account.cash += notional;
                if emptied {
                    account.positions.remove(code);
                }
            }
        }

        let order_id = account.next_order_id;
        account.next_order_id += 1;
        info!("synthetic fill: {} {} {:?} @ {} ({})", code, volume, side, price, remark);
        Ok(OrderAck { order_id })
    }

    async fn positions(&self) -> Result<Vec<Position>, TradeError> {
        Ok(self.account.lock().await.positions.values().cloned().collect())
    }

    async fn position(&self, code: &str) -> Result<Option<Position>, TradeError> {
        Ok(self.account.lock().await.positions.get(code).cloned())
    }

    async fn asset(&self) -> Result<AccountAsset, TradeError> {
        let account = self.account.lock().await;
        let holdings: Decimal = account
            .positions
            .values()
            .map(|p| p.volume * p.avg_cost)
            .sum();
        Ok(AccountAsset {
            cash: account.cash,
            frozen: Decimal::ZERO,
            total_asset: account.cash + holdings,
        })
    }

    async fn connect(&self) -> Result<(), TradeError> {
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_bars_are_deterministic() {
        let a = SyntheticMarketData::generate_bars("600000.SH", 63);
        let b = SyntheticMarketData::generate_bars("600000.SH", 63);
        assert_eq!(a, b);
        // 不同代码走出不同序列
        let c = SyntheticMarketData::generate_bars("000001.SZ", 63);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_bars_chain_pre_close() {
        let bars = SyntheticMarketData::generate_bars("600000.SH", 10);
        for w in bars.windows(2) {
            assert_eq!(w[1].pre_close, w[0].close);
        }
    }

    #[tokio::test]
    async fn test_paper_fill_roundtrip() {
        let broker = SyntheticBroker::new(dec!(100000));
        broker
            .submit_limit_order("600000.SH", OrderSide::Buy, dec!(11), dec!(3400), "测试买入")
            .await
            .expect("buy fills");

        let asset = broker.asset().await.expect("asset");
        assert_eq!(asset.cash, dec!(62600));

        let pos = broker
            .position("600000.SH")
            .await
            .expect("query")
            .expect("held");
        assert_eq!(pos.volume, dec!(3400));
        assert_eq!(pos.avg_cost, dec!(11));

        broker
            .submit_limit_order("600000.SH", OrderSide::Sell, dec!(12), dec!(3400), "测试卖出")
            .await
            .expect("sell fills");
        assert!(broker.position("600000.SH").await.expect("query").is_none());
        let asset = broker.asset().await.expect("asset");
        assert_eq!(asset.cash, dec!(100000) + dec!(3400));
    }

    #[tokio::test]
    async fn test_buy_rejected_without_cash() {
        let broker = SyntheticBroker::new(dec!(100));
        let result = broker
            .submit_limit_order("600000.SH", OrderSide::Buy, dec!(11), dec!(100), "测试")
            .await;
        assert!(matches!(result, Err(TradeError::OrderRejected(_))));
    }
}
