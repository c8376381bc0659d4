use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use backoffice::{
    api,
    clock::FixedClock,
    config::Settings,
    domain::{CreateSubscriptionRequest, CreateUserRequest, Subscription},
    service::ServiceContext,
    uploads::MAX_FILE_SIZE,
};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_test";

async fn setup() -> anyhow::Result<(Router, Arc<ServiceContext>, Arc<FixedClock>)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let mut settings = Settings::default();
    settings.uploads.dir = std::env::temp_dir()
        .join(format!("backoffice-api-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    settings.stripe.enabled = true;
    settings.stripe.webhook_secret = Some(WEBHOOK_SECRET.to_string());

    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()));
    let ctx = Arc::new(ServiceContext::new(pool, &settings, clock.clone()));
    let app = api::create_app(ctx.clone(), Arc::new(settings));
    Ok((app, ctx, clock))
}

async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Logs in and returns the `session=...` cookie pair and the CSRF token.
async fn login(app: &Router, ctx: &ServiceContext, email: &str, is_admin: bool) -> anyhow::Result<(String, String)> {
    ctx.user_repo.create(CreateUserRequest {
        name: "Admin".to_string(),
        email: email.to_string(),
        password: Some("s3cret-pass".to_string()),
        is_admin,
    }).await?;

    let response = app.clone().oneshot(
        Request::post("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "email": email, "password": "s3cret-pass" }).to_string()))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string();
    let body = body_json(response).await?;
    let csrf = body["csrf_token"].as_str().expect("csrf token").to_string();

    Ok((cookie, csrf))
}

/// Stripe checks the signature timestamp against wall-clock time.
fn stripe_signature(secret: &str, payload: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn refund_event(event_id: &str, refund_id: &str, status: &str) -> String {
    json!({
        "id": event_id,
        "object": "event",
        "created": 1_718_020_800,
        "livemode": false,
        "pending_webhooks": 1,
        "request": { "id": null, "idempotency_key": null },
        "type": "charge.refund.updated",
        "data": { "object": {
            "id": refund_id,
            "object": "refund",
            "amount": 4990,
            "created": 1_718_020_800,
            "currency": "brl",
            "status": status,
            "metadata": { "subscription_id": "sub_123" }
        }}
    }).to_string()
}

async fn subscription(ctx: &ServiceContext, stripe_id: &str) -> anyhow::Result<Subscription> {
    let org = ctx.organization_repo.create("Acme").await?;
    Ok(ctx.subscription_repo.create(CreateSubscriptionRequest {
        organization_id: org.id,
        stripe_subscription_id: stripe_id.to_string(),
        price_id: None,
        status: "active".to_string(),
    }).await?)
}

fn multipart_upload(filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "backoffice-test-boundary";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        b = boundary,
        f = filename
    ).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[tokio::test]
async fn test_health_is_public() -> anyhow::Result<()> {
    let (app, _, _) = setup().await?;
    let response = app.oneshot(Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_admin_requires_session() -> anyhow::Result<()> {
    let (app, _, _) = setup().await?;
    let response = app.oneshot(Request::get("/admin/tickets").body(Body::empty())?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_admin_rejects_non_admin_user() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let (cookie, _) = login(&app, &ctx, "agent@example.com", false).await?;

    let response = app.oneshot(
        Request::get("/admin/tickets")
            .header(header::COOKIE, cookie)
            .body(Body::empty())?,
    ).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_mutations_need_csrf_token() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let (cookie, csrf) = login(&app, &ctx, "admin@example.com", true).await?;
    let body = json!({ "ids": [uuid::Uuid::new_v4()] }).to_string();

    let response = app.clone().oneshot(
        Request::post("/admin/tickets/bulk-delete")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.clone()))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(
        Request::post("/admin/tickets/bulk-delete")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-csrf-token", "wrong")
            .body(Body::from(body.clone()))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(
        Request::post("/admin/tickets/bulk-delete")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-csrf-token", &csrf)
            .body(Body::from(body))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["deleted"], 0);

    // Reads never need the token
    let response = app.oneshot(
        Request::get("/admin/tickets/badge")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["count"], 0);

    Ok(())
}

#[tokio::test]
async fn test_webhook_paths_skip_csrf() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let (cookie, _) = login(&app, &ctx, "admin@example.com", true).await?;

    let response = app.oneshot(
        Request::post("/evolution/webhook")
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "event": "messages.upsert", "data": {} }).to_string()))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_stripe_refund_webhook_creates_refund() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let sub = subscription(&ctx, "sub_123").await?;
    let payload = refund_event("evt_1", "re_1", "pending");

    let response = app.clone().oneshot(
        Request::post("/stripe/webhook")
            .header("stripe-signature", stripe_signature(WEBHOOK_SECRET, &payload))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.clone()))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let refunds = ctx.refund_service.list_by_subscription(sub.id).await?;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].refund_id, "re_1");
    assert_eq!(refunds[0].organization_id, sub.organization_id);

    // Same payload signed with a different secret
    let response = app.oneshot(
        Request::post("/stripe/webhook")
            .header("stripe-signature", stripe_signature("whsec_other", &payload))
            .body(Body::from(payload))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_stripe_redelivery_is_stored_once() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let sub = subscription(&ctx, "sub_123").await?;
    let payload = refund_event("evt_retry", "re_retry", "succeeded");

    for _ in 0..2 {
        let response = app.clone().oneshot(
            Request::post("/stripe/webhook")
                .header("stripe-signature", stripe_signature(WEBHOOK_SECRET, &payload))
                .body(Body::from(payload.clone()))?,
        ).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM webhook_events WHERE external_id = ?")
        .bind("evt_retry")
        .fetch_one(&ctx.db_pool)
        .await?;
    assert_eq!(stored, 1);
    assert_eq!(ctx.refund_service.list_by_subscription(sub.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_upload_stores_file_and_serves_it_to_admins() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let (cookie, csrf) = login(&app, &ctx, "admin@example.com", true).await?;

    let (content_type, body) = multipart_upload("report.pdf", b"%PDF-1.4 test");
    let response = app.clone().oneshot(
        Request::post("/admin/uploads?kind=file")
            .header(header::COOKIE, &cookie)
            .header("x-csrf-token", &csrf)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let path = body_json(response).await?["path"].as_str().expect("stored path").to_string();
    assert!(path.starts_with("files/") && path.ends_with(".pdf"));

    let response = app.clone().oneshot(
        Request::get(format!("/admin/files/{}", path))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Stored files are admin-only
    let response = app.clone().oneshot(
        Request::get(format!("/admin/files/{}", path)).body(Body::empty())?,
    ).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Images only accept image extensions
    let (content_type, body) = multipart_upload("report.pdf", b"%PDF-1.4 test");
    let response = app.clone().oneshot(
        Request::post("/admin/uploads?kind=image")
            .header(header::COOKIE, &cookie)
            .header("x-csrf-token", &csrf)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // One byte over the cap, still inside the request body limit
    let (content_type, body) = multipart_upload("big.pdf", &vec![b'x'; MAX_FILE_SIZE + 1]);
    let response = app.oneshot(
        Request::post("/admin/uploads")
            .header(header::COOKIE, &cookie)
            .header("x-csrf-token", &csrf)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))?,
    ).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn test_ticket_resource_schema_carries_badge() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let (cookie, _) = login(&app, &ctx, "admin@example.com", true).await?;

    let response = app.oneshot(
        Request::get("/admin/resources/tickets")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())?,
    ).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["slug"], "tickets");
    assert_eq!(body["navigation"]["label"], "Solicitações");
    assert_eq!(body["navigation_badge"], 0);
    assert!(body["form"].as_array().is_some_and(|f| !f.is_empty()));
    assert!(body["table"].as_array().is_some_and(|t| !t.is_empty()));

    Ok(())
}

#[tokio::test]
async fn test_refund_endpoints() -> anyhow::Result<()> {
    let (app, ctx, _) = setup().await?;
    let (cookie, csrf) = login(&app, &ctx, "admin@example.com", true).await?;
    let sub = subscription(&ctx, "sub_123").await?;

    let create = |subscription_id: uuid::Uuid, refund_id: &str| {
        Request::post("/admin/refunds")
            .header(header::COOKIE, &cookie)
            .header("x-csrf-token", &csrf)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({
                "subscription_id": subscription_id,
                "refund_id": refund_id,
                "amount": 4990,
                "currency": "BRL",
                "reason": "requested_by_customer",
                "reference": null
            }).to_string()))
    };

    let response = app.clone().oneshot(create(sub.id, "re_admin")?).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await?;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["currency"], "brl");
    let refund_id = created["id"].as_str().expect("refund id").to_string();

    let response = app.clone().oneshot(create(uuid::Uuid::new_v4(), "re_orphan")?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let get = |uri: String| Request::get(uri).header(header::COOKIE, &cookie).body(Body::empty());

    let response = app.clone().oneshot(get(format!("/admin/refunds/{}", refund_id))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["refund_id"], "re_admin");

    let response = app.clone().oneshot(get(format!("/admin/refunds?organization_id={}", sub.organization_id))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?.as_array().map(Vec::len), Some(1));

    let response = app.clone().oneshot(get(format!("/admin/refunds?subscription_id={}", sub.id))?).await?;
    assert_eq!(body_json(response).await?.as_array().map(Vec::len), Some(1));

    // Exactly one scope is required
    let response = app.clone().oneshot(get("/admin/refunds".to_string())?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get(format!("/admin/refunds/{}", uuid::Uuid::new_v4()))?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
