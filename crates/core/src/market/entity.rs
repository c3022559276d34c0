use serde::{Deserialize, Serialize};

/// # Summary
/// 单个交易日的日线 K 线实体。
///
/// # Invariants
/// - 任何涨停判定要求 `pre_close > 0`，否则一律判否。
/// - K 线一经落盘即为不可变的历史事实，本系统从不回写。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayBar {
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 昨日收盘价
    pub pre_close: f64,
    // 当日成交额（元）
    pub amount: f64,
}

/// # Summary
/// K 线所处的会话状态，决定涨停判定用哪一组容差。
///
/// 盘中快照的价格仍在变动，收盘封板检查（close == high）不适用，
/// 且容差需要放宽以兼容尚未触及理论涨停价的情形。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarState {
    /// 已收盘的完整日线
    Completed,
    /// 盘中未完成快照
    Intraday,
}

/// # Summary
/// 规范化的实时行情切片。
///
/// 网关适配层负责把终端推送的原始字段（不同版本字段名不一致）
/// 一次性映射到此结构，核心逻辑只消费规范化后的值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSnapshot {
    // 最新成交价
    pub last_price: f64,
    // 当日最高价
    pub high: f64,
    // 昨日收盘价
    pub pre_close: f64,
    // 买一价
    pub bid1_price: f64,
    // 买一量（手，1 手 = 100 股）
    pub bid1_volume: f64,
    // 当日累计成交额（元）
    pub turnover: f64,
    // 流通市值（元），部分数据源不提供
    pub float_market_cap: Option<f64>,
}
