use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{CreateRefundRequest, SubscriptionRefund},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct RefundListParams {
    pub organization_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<RefundListParams>,
) -> Result<Json<Vec<SubscriptionRefund>>> {
    let refunds = &state.service_context.refund_service;

    let list = match (params.organization_id, params.subscription_id) {
        (Some(org), None) => refunds.list_by_organization(org).await?,
        (None, Some(sub)) => refunds.list_by_subscription(sub).await?,
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of organization_id or subscription_id".to_string(),
            ))
        }
    };

    Ok(Json(list))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubscriptionRefund>> {
    Ok(Json(state.service_context.refund_service.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRefundRequest>,
) -> Result<(StatusCode, Json<SubscriptionRefund>)> {
    let refund = state.service_context.refund_service.request_refund(request).await?;
    Ok((StatusCode::CREATED, Json(refund)))
}
