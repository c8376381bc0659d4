use std::sync::Arc;

use serde_json::Value;
use stripe::{Event, EventObject, Refund, Webhook, WebhookError};

use crate::{
    domain::{RefundUpdate, WebhookSource},
    error::{AppError, Result},
    service::{RefundOutcome, RefundService, WebhookInbox},
};

pub struct StripeWebhookHandler {
    webhook_secret: Option<String>,
    inbox: Arc<WebhookInbox>,
    refunds: Arc<RefundService>,
}

impl StripeWebhookHandler {
    pub fn new(
        webhook_secret: Option<String>,
        inbox: Arc<WebhookInbox>,
        refunds: Arc<RefundService>,
    ) -> Self {
        Self { webhook_secret, inbox, refunds }
    }

    /// Verifies, records and dispatches one delivery.
    pub async fn handle(&self, payload: &str, stripe_signature: &str) -> Result<()> {
        let secret = self.webhook_secret.as_deref().ok_or_else(|| {
            tracing::warn!("Stripe webhook received but no webhook secret is configured");
            AppError::BadRequest("Stripe webhooks are not configured".to_string())
        })?;

        match Webhook::construct_event(payload, stripe_signature, secret) {
            Ok(event) => self.dispatch(event, payload).await,
            // Only reached once the signature has been verified
            Err(WebhookError::BadParse(e)) => self.store_unparsed(payload, e).await,
            Err(WebhookError::BadSignature) => {
                tracing::warn!("Stripe webhook signature mismatch");
                Err(AppError::BadRequest("Invalid signature".to_string()))
            }
            Err(e) => {
                tracing::warn!("Rejected Stripe webhook: {}", e);
                Err(AppError::BadRequest(format!("Webhook error: {}", e)))
            }
        }
    }

    async fn dispatch(&self, event: Event, payload: &str) -> Result<()> {
        let event_id = event.id.to_string();
        let event_type = event_type_name(&event);

        let recorded = self
            .inbox
            .record(WebhookSource::Stripe, &event_type, Some(event_id.clone()), payload)
            .await?;
        if recorded.processed_at.is_some() {
            tracing::info!(event_id = %event_id, "Stripe event already processed; skipping redelivery");
            return Ok(());
        }

        tracing::info!(event_id = %event_id, event_type = %event_type, "Stripe webhook received");

        // refund.created, refund.updated, refund.failed and charge.refund.updated
        // all carry the refund itself
        match event.data.object {
            EventObject::Refund(refund) => {
                match self.refunds.apply_processor_update(refund_update(&refund)?).await? {
                    RefundOutcome::Created(r) | RefundOutcome::Updated(r) => {
                        tracing::info!(refund_id = %r.refund_id, status = r.status.as_str(), "Refund synced");
                    }
                    RefundOutcome::Ignored => {}
                }
            }
            _ => {
                tracing::debug!(event_type = %event_type, "Unhandled Stripe event type");
            }
        }

        self.inbox.mark_processed(recorded.id).await
    }

    /// Stores a verified delivery the typed event model could not read. It is
    /// left unprocessed so it stays visible in the inbox.
    async fn store_unparsed(&self, payload: &str, error: serde_json::Error) -> Result<()> {
        let raw: Value = serde_json::from_str(payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {}", e)))?;
        let event_type = raw.get("type").and_then(Value::as_str).unwrap_or("unknown");
        let event_id = raw.get("id").and_then(Value::as_str).map(str::to_string);

        tracing::warn!(event_type, "Stripe event not understood, stored unprocessed: {}", error);
        self.inbox
            .record(WebhookSource::Stripe, event_type, event_id, payload)
            .await?;
        Ok(())
    }
}

fn event_type_name(event: &Event) -> String {
    serde_json::to_value(&event.type_)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", event.type_))
}

fn refund_update(refund: &Refund) -> Result<RefundUpdate> {
    // Open-ended string fields and the per-method detail maps are read from
    // the serialized refund
    let fields = serde_json::to_value(refund)
        .map_err(|e| AppError::Internal(format!("Failed to read refund: {}", e)))?;
    let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

    let (reference, reference_status) = fields
        .get("destination_details")
        .map(destination_reference)
        .unwrap_or((None, None));

    Ok(RefundUpdate {
        refund_id: refund.id.to_string(),
        amount: Some(refund.amount),
        currency: text("currency"),
        status: parse_lenient("status", text("status")),
        reason: parse_lenient("reason", text("reason")),
        failure_reason: parse_lenient("failure_reason", text("failure_reason")),
        balance_transaction: fields.get("balance_transaction").and_then(expandable_id),
        object: Some("refund".to_string()),
        reference,
        reference_status,
        stripe_subscription_id: fields
            .pointer("/metadata/subscription_id")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Values the processor adds later are logged and dropped rather than failing the delivery.
fn parse_lenient<T: std::str::FromStr<Err = String>>(field: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(field, "Unrecognized refund value: {}", e);
            None
        }
    }
}

/// Expandable fields arrive either as an id or as the expanded object.
fn expandable_id(value: &Value) -> Option<String> {
    value
        .as_str()
        .or_else(|| value.get("id").and_then(Value::as_str))
        .map(str::to_string)
}

/// `destination_details` is keyed by payment method type; the first one
/// carrying a reference wins.
fn destination_reference(details: &Value) -> (Option<String>, Option<String>) {
    let Some(map) = details.as_object() else {
        return (None, None);
    };

    for value in map.values() {
        if let Some(reference) = value.get("reference").and_then(Value::as_str) {
            let status = value
                .get("reference_status")
                .and_then(Value::as_str)
                .map(str::to_string);
            return (Some(reference.to_string()), status);
        }
    }
    (None, None)
}
