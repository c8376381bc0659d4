use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::{
    clock::Clock,
    domain::{WebhookEvent, WebhookSource},
    error::Result,
    repository::WebhookEventRepository,
};

/// Durable log of inbound webhook deliveries.
pub struct WebhookInbox {
    events: Arc<dyn WebhookEventRepository>,
    clock: Arc<dyn Clock>,
}

impl WebhookInbox {
    pub fn new(events: Arc<dyn WebhookEventRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock }
    }

    /// Stores a delivery. A redelivery with an `external_id` already on file
    /// returns the stored event instead of adding a row; callers check
    /// `processed_at` to skip work that was finished.
    pub async fn record(
        &self,
        source: WebhookSource,
        event_type: &str,
        external_id: Option<String>,
        payload: &str,
    ) -> Result<WebhookEvent> {
        if let Some(external_id) = external_id.as_deref() {
            if let Some(existing) = self.events.find_by_external_id(source, external_id).await? {
                tracing::debug!(source = source.as_str(), external_id, "Webhook redelivery");
                return Ok(existing);
            }
        }

        let event = WebhookEvent {
            id: Uuid::new_v4(),
            source,
            event_type: event_type.to_string(),
            external_id,
            payload: payload.to_string(),
            received_at: self.clock.now(),
            processed_at: None,
        };

        let event = self.events.record(event).await?;
        tracing::debug!(source = source.as_str(), event_type, "Webhook event recorded");
        Ok(event)
    }

    pub async fn mark_processed(&self, id: Uuid) -> Result<()> {
        self.events.mark_processed(id, self.clock.now()).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<WebhookEvent>> {
        self.events.find_by_id(id).await
    }

    /// Deletes events received more than `retention_days` ago.
    pub async fn prune(&self, retention_days: i64) -> Result<u64> {
        let cutoff = self.clock.now() - Duration::days(retention_days.max(0));
        self.events.delete_received_before(cutoff).await
    }
}
