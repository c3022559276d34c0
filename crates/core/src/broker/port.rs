use crate::broker::entity::{AccountAsset, OrderAck, OrderSide, Position};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// # Summary
/// 券商交易环节中可能发生的错误。
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("券商通道未连接")]
    Disconnected,
    #[error("委托被拒绝: {0}")]
    OrderRejected(String),
    #[error("资金或持仓查询失败: {0}")]
    QueryFailed(String),
    #[error("调用超时: {0}")]
    Timeout(String),
    #[error("底层券商通道错误: {0}")]
    BrokerIntegrationError(String),
}

impl<E: Into<TradeError>> From<crate::common::retry::RetryError<E>> for TradeError {
    fn from(e: crate::common::retry::RetryError<E>) -> Self {
        match e {
            crate::common::retry::RetryError::Timeout(short, long) => {
                TradeError::Timeout(format!("{:?} then {:?}", short, long))
            }
            crate::common::retry::RetryError::Inner(inner) => inner.into(),
        }
    }
}

/// # Summary
/// 券商交易端口。夜间挂单、晨间校验与持仓监控
/// 通过此端口下发委托意图并查询账户真相。
///
/// # Invariants
/// - 必须 `Send + Sync`：调度线程与监控回调并发持有同一句柄。
/// - 查询失败与查询结果为空必须可区分——断连期间返回 `Err`，
///   绝不允许以空持仓列表冒充，否则监控侧会触发虚假卖出。
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// # Summary
    /// 提交一笔限价委托。
    ///
    /// # Arguments
    /// * `code`: 标的代码。
    /// * `side`: 买卖方向。
    /// * `price`: 限价（两位小数）。
    /// * `volume`: 委托数量，必须是一手 (100 股) 的整数倍。
    /// * `remark`: 委托备注，用于券商侧审计。
    ///
    /// # Returns
    /// * `Ok(OrderAck)` - 券商已受理，附委托编号
    /// * `Err(TradeError)` - 拒单、断连或通道故障
    async fn submit_limit_order(
        &self,
        code: &str,
        side: OrderSide,
        price: Decimal,
        volume: Decimal,
        remark: &str,
    ) -> Result<OrderAck, TradeError>;

    /// 查询全部持仓
    async fn positions(&self) -> Result<Vec<Position>, TradeError>;

    /// 查询单一标的持仓，无持仓返回 None
    async fn position(&self, code: &str) -> Result<Option<Position>, TradeError>;

    /// 查询账户资金快照
    async fn asset(&self) -> Result<AccountAsset, TradeError>;

    /// # Summary
    /// 建立（或重建）与券商通道的连接。
    ///
    /// # Logic
    /// 重连监督循环在断连后调用；实现内部应清理旧会话再握手。
    async fn connect(&self) -> Result<(), TradeError>;

    /// 当前通道是否在线
    async fn is_connected(&self) -> bool;
}
