use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{
        CreateTicketRequest, MemberOption, SortDirection, TicketFilter, TicketFormState,
        TicketSort, TicketStatus, UpdateTicketRequest,
    },
    error::{AppError, Result},
    service::{OrganizationSelection, TicketDetail, TicketPage, TicketView},
};

const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    search: Option<String>,
    status: Option<TicketStatus>,
    #[serde(default)]
    sort: TicketSort,
    #[serde(default)]
    direction: SortDirection,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl From<ListParams> for TicketFilter {
    fn from(params: ListParams) -> Self {
        TicketFilter {
            search: params.search.filter(|s| !s.trim().is_empty()),
            status: params.status,
            sort: params.sort,
            direction: params.direction,
            limit: params.limit.clamp(1, MAX_PAGE_SIZE),
            offset: params.offset.max(0),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TicketPage>> {
    let page = state.service_context.ticket_service.list(params.into()).await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketDetail>> {
    Ok(Json(state.service_context.ticket_service.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketView>)> {
    let ticket = state.service_context.ticket_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTicketRequest>,
) -> Result<Json<TicketView>> {
    Ok(Json(state.service_context.ticket_service.update(id, request).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.ticket_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>> {
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("No tickets selected".to_string()));
    }

    let deleted = state.service_context.ticket_service.delete_many(&request.ids).await?;
    tracing::info!(requested = request.ids.len(), deleted, "Bulk ticket delete");
    Ok(Json(BulkDeleteResponse { deleted }))
}

#[derive(Debug, Serialize)]
pub struct BadgeResponse {
    pub count: i64,
}

pub async fn badge(State(state): State<AppState>) -> Result<Json<BadgeResponse>> {
    let count = state.service_context.ticket_service.open_count().await?;
    Ok(Json(BadgeResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct UserOptionsParams {
    pub organization_id: Option<Uuid>,
}

pub async fn user_options(
    State(state): State<AppState>,
    Query(params): Query<UserOptionsParams>,
) -> Result<Json<Vec<MemberOption>>> {
    let options = state.service_context.ticket_service
        .user_options(params.organization_id)
        .await?;
    Ok(Json(options))
}

#[derive(Debug, Deserialize)]
pub struct SelectOrganizationRequest {
    #[serde(default)]
    pub state: TicketFormState,
    pub organization_id: Option<Uuid>,
}

pub async fn select_organization(
    State(state): State<AppState>,
    Json(request): Json<SelectOrganizationRequest>,
) -> Result<Json<OrganizationSelection>> {
    let selection = state.service_context.ticket_service
        .select_organization(request.state, request.organization_id)
        .await?;
    Ok(Json(selection))
}
