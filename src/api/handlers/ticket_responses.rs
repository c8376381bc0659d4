use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{CreateTicketResponseRequest, TicketResponse},
    error::Result,
};

pub async fn list(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<TicketResponse>>> {
    Ok(Json(state.service_context.ticket_service.list_responses(ticket_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<CreateTicketResponseRequest>,
) -> Result<(StatusCode, Json<TicketResponse>)> {
    let response = state.service_context.ticket_service
        .add_response(ticket_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((ticket_id, response_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state.service_context.ticket_service
        .delete_response(ticket_id, response_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
