//! # `shouban-trade` - 交易执行域
//!
//! 围绕候选清单的两阶段下单设计与持仓风控：
//! - [`alloc`]：安全垫与手续费预留后的等权资金分配
//! - [`planner`]：夜间挂单（乐观阶段，单轮无重试）
//! - [`reconcile`]：晨间校验（纠正阶段，以券商持仓为真相补单）
//! - [`monitor`]：实时止盈止损监控与订阅管理
//!
//! 所有委托提交都经挂单台账闸门去重；台账只在拿到券商回执后写入。

pub mod alloc;
pub mod monitor;
pub mod orders;
pub mod planner;
pub mod reconcile;

use shouban_core::broker::port::TradeError;
use shouban_core::market::error::MarketError;
use shouban_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 交易任务层的统一错误类型。
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Trade error: {0}")]
    Trade(#[from] TradeError),
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("no usable cash after reserves")]
    InsufficientFunds,
    #[error("task cancelled")]
    Cancelled,
}
