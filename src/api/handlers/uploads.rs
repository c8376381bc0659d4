use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
    uploads::AttachmentKind,
};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub kind: AttachmentKind,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Relative path to store in the ticket's `files` or `image_path`.
    pub path: String,
}

pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Missing file name".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::Validation("file: is empty".to_string()));
        }

        let path = state.service_context.attachments
            .save(params.kind, &filename, &data)
            .await?;

        tracing::info!(kind = ?params.kind, %path, "Attachment stored");
        return Ok((StatusCode::CREATED, Json(UploadResponse { path })));
    }

    Err(AppError::BadRequest("Missing 'file' field".to_string()))
}
