use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Backoffice API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Support tickets and subscription refunds administration",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "auth": "/auth/login",
            "admin": "/admin",
            "webhooks": ["/stripe/webhook", "/evolution/webhook"]
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
