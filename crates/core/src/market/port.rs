use crate::market::entity::{DayBar, TickSnapshot};
use crate::market::error::MarketError;
use async_trait::async_trait;
use futures::Stream;
use std::collections::{HashMap, HashSet};
use std::pin::Pin;

/// # Summary
/// 实时行情流别名：按标的代码标注的快照序列。
pub type TickStream = Pin<Box<dyn Stream<Item = (String, TickSnapshot)> + Send>>;

/// # Summary
/// 行情数据端口（原始数据源）。
///
/// 实现者可以是真实终端网关，也可以是合成数据源；
/// 由启动配置一次性选定，运行期间不允许静默切换。
///
/// # Invariants
/// - 全部方法可失败；调用方负责按批处理策略（跳过单标的）降级。
/// - `subscribe_ticks` 在连接中断后须具备自愈能力或轮询降级。
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// # Summary
    /// 拉取指定板块的全量标的代码清单。
    ///
    /// # Arguments
    /// * `sector`: 板块名称（如"沪深A股"）。
    ///
    /// # Returns
    /// 交易所限定代码列表。
    async fn universe(&self, sector: &str) -> Result<Vec<String>, MarketError>;

    /// # Summary
    /// 批量获取证券简称，用于 ST 风险警示判定。
    ///
    /// # Returns
    /// code -> 简称 的映射；缺失的标的不出现在映射中。
    async fn instrument_names(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, String>, MarketError>;

    /// # Summary
    /// 批量获取最近一个会话的停牌标的集合。
    ///
    /// # Returns
    /// 当前处于停牌状态的代码集合。
    async fn suspended(&self, codes: &[String]) -> Result<HashSet<String>, MarketError>;

    /// # Summary
    /// 获取指定标的最近 `count` 根日线（按时间升序，最后一根最新）。
    ///
    /// # Arguments
    /// * `code`: 标的代码。
    /// * `count`: 回溯根数。
    async fn daily_bars(&self, code: &str, count: usize) -> Result<Vec<DayBar>, MarketError>;

    /// # Summary
    /// 获取指定标的的昨日收盘价。
    async fn last_close(&self, code: &str) -> Result<f64, MarketError>;

    /// # Summary
    /// 获取指定标的的实时行情切片。
    async fn tick(&self, code: &str) -> Result<TickSnapshot, MarketError>;

    /// # Summary
    /// 订阅一组标的的实时行情流。
    ///
    /// # Logic
    /// 1. 建立推送通道或启动内部轮询。
    /// 2. 持续产出 (code, snapshot) 对。
    ///
    /// # Arguments
    /// * `codes`: 订阅的标的集合。
    ///
    /// # Returns
    /// 成功返回异步流。
    async fn subscribe_ticks(&self, codes: &[String]) -> Result<TickStream, MarketError>;
}
