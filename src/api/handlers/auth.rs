use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    api::state::AppState,
    auth::{AuthService, SESSION_COOKIE},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    pub csrf_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let ctx = &state.service_context;

    // Users created without a password cannot log in
    let password_hash = ctx.user_repo
        .password_hash(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !AuthService::verify_password(&req.password, &password_hash).await? {
        tracing::info!("Failed login attempt");
        return Err(AppError::Unauthorized);
    }

    let user = ctx.user_repo
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let (session, token) = ctx.auth_service.create_session(user.id).await?;
    let csrf_token = ctx.csrf_service.issue(&session.id).await?;

    let cookie = ctx.auth_service
        .session_cookie(&token, state.settings.auth.secure_cookies);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            csrf_token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    let ctx = &state.service_context;

    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(Some(session)) = ctx.auth_service.validate_session(session_cookie.value()).await {
            if let Err(e) = ctx.csrf_service.revoke(&session.id).await {
                tracing::warn!("Failed to revoke CSRF token: {}", e);
            }
        }
        ctx.auth_service.invalidate_session(session_cookie.value()).await?;
    }

    Ok((jar.add(AuthService::logout_cookie()), StatusCode::NO_CONTENT))
}

/// Rotates the CSRF token of the current session.
pub async fn csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<CsrfResponse>> {
    let ctx = &state.service_context;

    let session_cookie = jar.get(SESSION_COOKIE).ok_or(AppError::Unauthorized)?;
    let session = ctx.auth_service
        .validate_session(session_cookie.value())
        .await?
        .ok_or(AppError::Unauthorized)?;

    let csrf_token = ctx.csrf_service.issue(&session.id).await?;
    Ok(Json(CsrfResponse { csrf_token }))
}
