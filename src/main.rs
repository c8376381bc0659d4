use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backoffice::{
    api,
    clock::SystemClock,
    config::Settings,
    jobs::{CleanWebhookEvents, Scheduler},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backoffice=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting backoffice server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let service_context = Arc::new(ServiceContext::new(
        db_pool.clone(),
        &settings,
        Arc::new(SystemClock),
    ));

    match service_context.auth_service.cleanup_expired_sessions().await {
        Ok(n) if n > 0 => tracing::info!("Removed {} expired sessions", n),
        Ok(_) => {}
        Err(e) => tracing::warn!("Session cleanup failed: {}", e),
    }

    if settings.stripe.enabled && settings.stripe.webhook_secret.is_none() {
        tracing::warn!("Stripe enabled but no webhook secret configured; deliveries will be rejected");
    }

    // Scheduled webhook-event cleanup
    if settings.scheduler.enabled {
        let job = Arc::new(CleanWebhookEvents::new(
            service_context.webhook_inbox.clone(),
            settings.scheduler.webhook_retention_days,
        ));
        Scheduler::new(&settings.scheduler.cleanup_cron, job, service_context.clock.clone())?
            .spawn();
        tracing::info!(cron = %settings.scheduler.cleanup_cron, "Webhook cleanup scheduled");
    } else {
        tracing::info!("Scheduler disabled");
    }

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
