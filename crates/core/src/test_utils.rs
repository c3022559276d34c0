//! 测试辅助实现：内存版端口适配器。
//!
//! 供各 crate 的单元 / 集成测试注入，行为与真实适配器契约一致
//! 但不触碰网络与磁盘。通过 `test-utils` feature 对外暴露。

use crate::broker::entity::{AccountAsset, OrderAck, OrderSide, Position};
use crate::broker::port::{BrokerPort, TradeError};
use crate::market::entity::{DayBar, TickSnapshot};
use crate::market::error::MarketError;
use crate::market::port::{MarketDataPort, TickStream};
use crate::store::error::StoreError;
use crate::store::port::{CandidateStore, LedgerEntry, OrderLedger};
use crate::strategy::entity::CandidateList;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, RwLock};

/// # Summary
/// 静态行情源：从内存表回答一切查询。
#[derive(Default)]
pub struct StaticMarketData {
    universe: Vec<String>,
    names: HashMap<String, String>,
    suspended: HashSet<String>,
    bars: HashMap<String, Vec<DayBar>>,
    ticks: HashMap<String, TickSnapshot>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_universe(mut self, codes: &[&str]) -> Self {
        self.universe = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_name(mut self, code: &str, name: &str) -> Self {
        self.names.insert(code.to_string(), name.to_string());
        self
    }

    pub fn with_suspended(mut self, code: &str) -> Self {
        self.suspended.insert(code.to_string());
        self
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<DayBar>) -> Self {
        self.bars.insert(code.to_string(), bars);
        self
    }

    pub fn with_tick(mut self, code: &str, tick: TickSnapshot) -> Self {
        self.ticks.insert(code.to_string(), tick);
        self
    }
}

#[async_trait]
impl MarketDataPort for StaticMarketData {
    async fn universe(&self, _sector: &str) -> Result<Vec<String>, MarketError> {
        Ok(self.universe.clone())
    }

    async fn instrument_names(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, String>, MarketError> {
        Ok(codes
            .iter()
            .filter_map(|c| self.names.get(c).map(|n| (c.clone(), n.clone())))
            .collect())
    }

    async fn suspended(&self, _codes: &[String]) -> Result<HashSet<String>, MarketError> {
        Ok(self.suspended.clone())
    }

    async fn daily_bars(&self, code: &str, count: usize) -> Result<Vec<DayBar>, MarketError> {
        let bars = self.bars.get(code).ok_or(MarketError::NotFound)?;
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }

    async fn last_close(&self, code: &str) -> Result<f64, MarketError> {
        self.bars
            .get(code)
            .and_then(|b| b.last())
            .map(|b| b.close)
            .ok_or(MarketError::NotFound)
    }

    async fn tick(&self, code: &str) -> Result<TickSnapshot, MarketError> {
        self.ticks.get(code).cloned().ok_or(MarketError::NotFound)
    }

    async fn subscribe_ticks(&self, codes: &[String]) -> Result<TickStream, MarketError> {
        let items: Vec<(String, TickSnapshot)> = codes
            .iter()
            .filter_map(|c| self.ticks.get(c).map(|t| (c.clone(), t.clone())))
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// 测试中记录下来的一笔已提交委托
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub code: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub volume: Decimal,
    pub remark: String,
}

struct PaperBrokerState {
    connected: bool,
    asset: AccountAsset,
    positions: Vec<Position>,
    // 让第 N 次提交失败（0-based），模拟拒单
    reject_submissions: HashSet<usize>,
    submit_count: usize,
    next_order_id: i64,
}

/// # Summary
/// 纸面券商：记录委托而不真正路由，持仓与资金由测试脚本摆放。
pub struct PaperBroker {
    state: RwLock<PaperBrokerState>,
    submitted: Mutex<Vec<SubmittedOrder>>,
}

impl PaperBroker {
    pub fn new(cash: Decimal) -> Self {
        Self {
            state: RwLock::new(PaperBrokerState {
                connected: true,
                asset: AccountAsset {
                    cash,
                    frozen: Decimal::ZERO,
                    total_asset: cash,
                },
                positions: Vec::new(),
                reject_submissions: HashSet::new(),
                submit_count: 0,
                next_order_id: 1,
            }),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub async fn seed_position(&self, position: Position) {
        self.state.write().await.positions.push(position);
    }

    pub async fn set_connected(&self, connected: bool) {
        self.state.write().await.connected = connected;
    }

    /// 预约让第 `n` 次（0-based）提交被拒
    pub async fn reject_submission(&self, n: usize) {
        self.state.write().await.reject_submissions.insert(n);
    }

    pub async fn submitted(&self) -> Vec<SubmittedOrder> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl BrokerPort for PaperBroker {
    async fn submit_limit_order(
        &self,
        code: &str,
        side: OrderSide,
        price: Decimal,
        volume: Decimal,
        remark: &str,
    ) -> Result<OrderAck, TradeError> {
        let mut state = self.state.write().await;
        if !state.connected {
            return Err(TradeError::Disconnected);
        }
        let seq = state.submit_count;
        state.submit_count += 1;
        if state.reject_submissions.contains(&seq) {
            return Err(TradeError::OrderRejected("scripted rejection".into()));
        }
        let order_id = state.next_order_id;
        state.next_order_id += 1;
        drop(state);

        self.submitted.lock().await.push(SubmittedOrder {
            code: code.to_string(),
            side,
            price,
            volume,
            remark: remark.to_string(),
        });
        Ok(OrderAck { order_id })
    }

    async fn positions(&self) -> Result<Vec<Position>, TradeError> {
        let state = self.state.read().await;
        if !state.connected {
            return Err(TradeError::Disconnected);
        }
        Ok(state.positions.clone())
    }

    async fn position(&self, code: &str) -> Result<Option<Position>, TradeError> {
        let state = self.state.read().await;
        if !state.connected {
            return Err(TradeError::Disconnected);
        }
        Ok(state.positions.iter().find(|p| p.code == code).cloned())
    }

    async fn asset(&self) -> Result<AccountAsset, TradeError> {
        let state = self.state.read().await;
        if !state.connected {
            return Err(TradeError::Disconnected);
        }
        Ok(state.asset.clone())
    }

    async fn connect(&self) -> Result<(), TradeError> {
        self.state.write().await.connected = true;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }
}

/// # Summary
/// 内存版挂单台账，契约与文件版一致但不落盘。
#[derive(Default)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<String, LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderLedger for MemoryLedger {
    async fn already_placed(&self, code: &str, date: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .get(code)
            .is_some_and(|e| e.date == date))
    }

    async fn mark_placed(&self, code: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.entries.write().await.insert(
            code.to_string(),
            LedgerEntry {
                timestamp: now.timestamp(),
                date: crate::common::trade_date(now),
            },
        );
        Ok(())
    }

    async fn prune(&self, now: DateTime<Utc>, max_age_days: i64) -> Result<usize, StoreError> {
        let cutoff = now.timestamp() - max_age_days * 24 * 3600;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.timestamp > cutoff);
        Ok(before - entries.len())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// # Summary
/// 内存版候选清单存储。
#[derive(Default)]
pub struct MemoryCandidateStore {
    latest: RwLock<Option<CandidateList>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn save(&self, list: &CandidateList) -> Result<(), StoreError> {
        *self.latest.write().await = Some(list.clone());
        Ok(())
    }

    async fn load_latest(&self) -> Result<Option<CandidateList>, StoreError> {
        Ok(self.latest.read().await.clone())
    }
}
