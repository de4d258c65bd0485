use async_trait::async_trait;
use reqwest::Client;

use super::{Notification, Notifier};
use crate::error::{AppError, AppResult};

/// Posts each notification as JSON to a mail relay.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        self.client
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Internal(format!("Mail relay request failed: {}", e)))?;

        tracing::debug!(
            kind = ?notification.kind,
            to = %notification.to_email,
            "Notification delivered to mail relay"
        );
        Ok(())
    }
}
