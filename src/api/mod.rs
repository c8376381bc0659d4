pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
    uploads::MAX_FILE_SIZE,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/csrf", get(handlers::auth::csrf_token))

        // Inbound webhooks (CSRF-exempt by configuration)
        .route("/stripe/webhook", post(handlers::webhooks::stripe))
        .route("/evolution/webhook", post(handlers::webhooks::evolution))

        .nest("/admin", admin_routes(app_state.clone()))

        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::csrf::verify_csrf,
        ))
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn admin_routes(state: AppState) -> Router<AppState> {
    let attachments_dir = state.settings.uploads.dir.clone();

    Router::new()
        .route("/resources/tickets", get(handlers::resources::tickets))
        .merge(ticket_routes())
        .route("/organizations", get(handlers::organizations::list))
        .route(
            "/uploads",
            post(handlers::uploads::upload).layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 64 * 1024)),
        )
        .route(
            "/refunds",
            get(handlers::refunds::list).post(handlers::refunds::create),
        )
        .route("/refunds/:id", get(handlers::refunds::get))
        // Stored attachments, by the relative path returned from /uploads
        .nest_service("/files", ServeDir::new(attachments_dir))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(handlers::tickets::list).post(handlers::tickets::create))
        .route("/tickets/badge", get(handlers::tickets::badge))
        .route("/tickets/bulk-delete", post(handlers::tickets::bulk_delete))
        .route("/tickets/form/user-options", get(handlers::tickets::user_options))
        .route("/tickets/form/organization", post(handlers::tickets::select_organization))
        .route(
            "/tickets/:id",
            get(handlers::tickets::get)
                .put(handlers::tickets::update)
                .delete(handlers::tickets::delete),
        )
        .route(
            "/tickets/:id/responses",
            get(handlers::ticket_responses::list).post(handlers::ticket_responses::create),
        )
        .route(
            "/tickets/:id/responses/:response_id",
            axum::routing::delete(handlers::ticket_responses::delete),
        )
}
