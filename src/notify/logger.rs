use async_trait::async_trait;

use super::{Notification, Notifier};
use crate::error::AppResult;

/// Writes notifications to the log. Used when no mail relay is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        tracing::info!(
            kind = ?notification.kind,
            to = %notification.to_email,
            subject = %notification.subject,
            "Mail relay not configured, skipping email"
        );
        Ok(())
    }
}
