use thiserror::Error;

/// # Summary
/// 行情数据域错误枚举，覆盖网关通讯、载荷解析及数据缺失。
///
/// # Invariants
/// - 选股批处理对单标的错误的处理策略是"记录并跳过"，
///   本枚举的任何变体都不应导致整批任务中止。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 载荷解析错误，如 JSON 字段不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的标的或区间无数据
    #[error("Data not found")]
    NotFound,
    // 调用超时（含一次重试后）
    #[error("Request timed out: {0}")]
    Timeout(String),
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl<E: Into<MarketError>> From<crate::common::retry::RetryError<E>> for MarketError {
    fn from(e: crate::common::retry::RetryError<E>) -> Self {
        match e {
            crate::common::retry::RetryError::Timeout(short, long) => {
                MarketError::Timeout(format!("{:?} then {:?}", short, long))
            }
            crate::common::retry::RetryError::Inner(inner) => inner.into(),
        }
    }
}
