use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::{csrf::CSRF_HEADER, SESSION_COOKIE},
    error::AppError,
};

/// Cookie-authenticated writes must echo the session's CSRF token. Requests
/// without a session cookie carry no ambient authority and pass through.
pub async fn verify_csrf(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let ctx = &state.service_context;
    if ctx.csrf_exemptions.is_exempt(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let Some(session_cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(next.run(request).await);
    };

    let Some(session) = ctx.auth_service.validate_session(session_cookie.value()).await? else {
        // Stale cookie: the auth layer will reject it where a session is needed
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(path = %request.uri().path(), "Missing CSRF token");
            AppError::Forbidden
        })?;

    if !ctx.csrf_service.verify(&session.id, token).await? {
        tracing::warn!(path = %request.uri().path(), "Invalid CSRF token");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
