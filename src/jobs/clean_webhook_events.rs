use std::sync::Arc;

use async_trait::async_trait;

use super::Job;
use crate::error::Result;
use crate::service::WebhookInbox;

/// Prunes stored webhook deliveries past the retention window.
pub struct CleanWebhookEvents {
    inbox: Arc<WebhookInbox>,
    retention_days: i64,
}

impl CleanWebhookEvents {
    pub fn new(inbox: Arc<WebhookInbox>, retention_days: i64) -> Self {
        Self { inbox, retention_days }
    }
}

#[async_trait]
impl Job for CleanWebhookEvents {
    fn name(&self) -> &'static str {
        "clean_webhook_events"
    }

    async fn run(&self) -> Result<()> {
        let deleted = self.inbox.prune(self.retention_days).await?;
        tracing::info!(deleted, retention_days = self.retention_days, "Webhook events pruned");
        Ok(())
    }
}
