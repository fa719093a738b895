//! Outbound reminder delivery.

use async_trait::async_trait;
use billwise_core::notifications::{ChannelRef, NotifierTrait, ReminderOption};
use billwise_core::utils::async_retry;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    channel: &'a str,
    chat_id: &'a str,
    text: &'a str,
    options: &'a [ReminderOption],
}

#[derive(Debug, thiserror::Error)]
enum WebhookError {
    /// Connection problems and 5xx answers; worth another attempt.
    #[error("{0}")]
    Transient(String),
    #[error("rejected with status {0}")]
    Rejected(reqwest::StatusCode),
}

/// Posts reminders to a relay that owns the actual chat integrations.
/// A 2xx answer counts as delivered.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    retries: u32,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration, retries: u32) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            retries,
        })
    }

    async fn post_once(&self, payload: &WebhookPayload<'_>) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WebhookError::Transient(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_server_error() {
            Err(WebhookError::Transient(format!("server answered {}", status)))
        } else {
            Err(WebhookError::Rejected(status))
        }
    }
}

#[async_trait]
impl NotifierTrait for WebhookNotifier {
    async fn deliver(&self, channel: &ChannelRef, text: &str, options: &[ReminderOption]) -> bool {
        let payload = WebhookPayload {
            channel: &channel.channel,
            chat_id: &channel.chat_id,
            text,
            options,
        };

        let payload = &payload;
        let result = async_retry(self.retries, RETRY_BACKOFF, move || async move {
            match self.post_once(payload).await {
                // Not retried: the relay will not change its mind.
                Err(WebhookError::Rejected(status)) => Ok(Err(status)),
                Err(e) => Err(e),
                Ok(()) => Ok(Ok(())),
            }
        })
        .await;

        match result {
            Ok(Ok(())) => {
                debug!("Delivered reminder to {} {}", channel.channel, channel.chat_id);
                true
            }
            Ok(Err(status)) => {
                warn!(
                    "Relay rejected reminder for {} {}: {}",
                    channel.channel, channel.chat_id, status
                );
                false
            }
            Err(e) => {
                warn!(
                    "Giving up on reminder for {} {}: {}",
                    channel.channel, channel.chat_id, e
                );
                false
            }
        }
    }
}

/// Used when no relay is configured. Logs the reminder and reports it as
/// undelivered so its row stays pending.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotifierTrait for LogNotifier {
    async fn deliver(&self, channel: &ChannelRef, text: &str, options: &[ReminderOption]) -> bool {
        let actions: Vec<&str> = options.iter().map(|o| o.action_id.as_str()).collect();
        info!(
            channel = %channel.channel,
            chat_id = %channel.chat_id,
            ?actions,
            "No notifier configured, reminder not sent:\n{}",
            text
        );
        false
    }
}
