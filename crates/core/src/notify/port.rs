use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 外部通知端口。选股结果、挂单汇总与止盈止损触发
/// 通过此端口推送给值守人员。
///
/// # Invariants
/// - 实现必须 `Send + Sync`，可能被调度任务与监控回调并发调用。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 发送一条带主题的文本通知。
    ///
    /// # Arguments
    /// * `subject` - 通知主题。
    /// * `content` - 通知正文。
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError>;
}
