use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    domain::WebhookSource,
    error::{AppError, Result},
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<Value>)> {
    if !state.settings.stripe.enabled {
        return Err(AppError::NotFound("Stripe webhooks are disabled".to_string()));
    }

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    state.stripe_webhooks.handle(&body, signature).await?;

    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}

/// Messaging-platform deliveries are stored as-is for auditing.
pub async fn evolution(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<Value>)> {
    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let event_type = parsed
        .as_ref()
        .and_then(|v| v.get("event"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let external_id = parsed
        .as_ref()
        .and_then(|v| v.pointer("/data/key/id"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let inbox = &state.service_context.webhook_inbox;
    let event = inbox
        .record(WebhookSource::Evolution, &event_type, external_id, &body)
        .await?;
    if event.processed_at.is_none() {
        inbox.mark_processed(event.id).await?;
    }

    tracing::info!(event_type = %event_type, "Evolution webhook stored");
    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
