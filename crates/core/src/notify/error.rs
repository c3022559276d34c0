use thiserror::Error;

/// # Summary
/// 通知域错误枚举。
///
/// 通知是尽力而为的旁路能力，失败只记录日志，
/// 绝不反向阻塞选股或交易任务。
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 发送通道网络失败
    #[error("Network error: {0}")]
    Network(String),
    /// 对端平台返回错误
    #[error("Platform error: {0}")]
    Platform(String),
}
