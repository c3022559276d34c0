use async_trait::async_trait;
use serde::Serialize;
use shouban_core::notify::error::NotifyError;
use shouban_core::notify::port::Notifier;

/// # Summary
/// A notifier implementation that posts messages to a WeCom (企业微信)
/// group-robot webhook.
///
/// # Invariants
/// * `webhook_url` must be a full robot webhook address including its key.
pub struct WebhookNotifier {
    /// The robot webhook URL.
    webhook_url: String,
    /// The HTTP client used for requests.
    client: reqwest::Client,
}

/// # Summary
/// Payload structure for the WeCom robot `text` message type.
#[derive(Serialize)]
struct WebhookMessage {
    msgtype: String,
    text: WebhookText,
}

#[derive(Serialize)]
struct WebhookText {
    content: String,
}

impl WebhookNotifier {
    /// # Summary
    /// Creates a new `WebhookNotifier`.
    ///
    /// # Arguments
    /// * `webhook_url` - The full robot webhook address.
    ///
    /// # Returns
    /// * A new instance of `WebhookNotifier`.
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    /// # Summary
    /// Sends a notification to the configured webhook.
    ///
    /// # Logic
    /// 1. Joins subject and content into a single text body.
    /// 2. Posts the robot `text` payload as JSON.
    /// 3. Maps transport failures and non-success statuses to `NotifyError`.
    ///
    /// # Arguments
    /// * `subject` - The subject line of the notification.
    /// * `content` - The main content of the notification.
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError> {
        let payload = WebhookMessage {
            msgtype: "text".to_string(),
            text: WebhookText {
                content: format!("【{}】\n{}", subject, content),
            },
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "webhook error: {}",
                error_text
            )));
        }

        Ok(())
    }
}
