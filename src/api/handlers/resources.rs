use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    api::state::AppState,
    domain::{ticket_resource, ResourceSchema},
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    #[serde(flatten)]
    pub schema: ResourceSchema,
    /// Navigation badge: open tickets right now.
    pub navigation_badge: i64,
}

pub async fn tickets(State(state): State<AppState>) -> Result<Json<ResourceResponse>> {
    let navigation_badge = state.service_context.ticket_service.open_count().await?;

    Ok(Json(ResourceResponse {
        schema: ticket_resource(),
        navigation_badge,
    }))
}
