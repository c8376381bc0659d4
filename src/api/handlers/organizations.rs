use axum::{extract::State, Json};

use crate::{
    api::state::AppState,
    domain::Organization,
    error::Result,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Organization>>> {
    let organizations = state.service_context.organization_repo.list().await?;
    Ok(Json(organizations))
}
