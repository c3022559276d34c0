use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// # Summary
/// 带超时的 RPC 调用包装错误。
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// 两次尝试均超时
    #[error("operation timed out after retry ({0:?} then {1:?})")]
    Timeout(Duration, Duration),
    /// 底层调用自身返回的错误
    #[error(transparent)]
    Inner(E),
}

/// # Summary
/// 行情 / 券商 RPC 的标准包装：短超时首试，超时后以长超时重试一次。
///
/// # Logic
/// 1. 以 `short` 为限时执行一次 `op`。
/// 2. 若限时内返回（无论 Ok/Err），原样透出。
/// 3. 若超时，告警后以 `long` 为限时再执行一次；仍超时则判定该子操作失败。
///
/// # Invariants
/// - 只对超时重试；底层错误不重试（由批处理层决定跳过还是中止）。
///
/// # Arguments
/// * `label`: 日志用的操作名。
/// * `short`: 首次尝试限时。
/// * `long`: 重试限时。
/// * `op`: 产生调用 Future 的闭包，可被调用两次。
pub async fn with_timeout_retry<T, E, F, Fut>(
    label: &str,
    short: Duration,
    long: Duration,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(short, op()).await {
        Ok(result) => result.map_err(RetryError::Inner),
        Err(_) => {
            warn!("{} timed out after {:?}, retrying...", label, short);
            match tokio::time::timeout(long, op()).await {
                Ok(result) => result.map_err(RetryError::Inner),
                Err(_) => {
                    warn!("{} failed after retry", label);
                    Err(RetryError::Timeout(short, long))
                }
            }
        }
    }
}
