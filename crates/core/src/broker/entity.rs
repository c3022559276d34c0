use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 委托方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// 买入
    Buy,
    /// 卖出
    Sell,
}

/// # Summary
/// 规范化持仓实体。券商是持仓的唯一权威来源，
/// 本系统只读；字段在网关适配层一次性映射完成。
///
/// # Invariants
/// - `usable_volume <= volume`（在途冻结部分不可交易）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    // 标的代码
    pub code: String,
    // 总持仓数量（股）
    pub volume: Decimal,
    // 当前可交易数量（股）
    pub usable_volume: Decimal,
    // 持仓均价
    pub avg_cost: Decimal,
}

/// # Summary
/// 账户资金快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAsset {
    // 可用资金
    pub cash: Decimal,
    // 冻结资金（挂单未成交部分占用）
    pub frozen: Decimal,
    // 总资产
    pub total_asset: Decimal,
}

/// # Summary
/// 委托提交回执。只有拿到回执后才允许写入挂单台账。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    // 券商侧委托编号
    pub order_id: i64,
}
