use std::sync::Arc;

use backoffice::{
    clock::FixedClock,
    config::Settings,
    domain::{
        CreateRefundRequest, CreateSubscriptionRequest, RefundFailureReason, RefundReason,
        RefundStatus, RefundUpdate, Subscription,
    },
    error::AppError,
    service::{RefundOutcome, ServiceContext},
};
use chrono::{TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;

async fn setup() -> anyhow::Result<ServiceContext> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()));
    Ok(ServiceContext::new(pool, &Settings::default(), clock))
}

async fn subscription(ctx: &ServiceContext, stripe_id: &str) -> anyhow::Result<Subscription> {
    let org = ctx.organization_repo.create("Acme").await?;
    Ok(ctx.subscription_repo.create(CreateSubscriptionRequest {
        organization_id: org.id,
        stripe_subscription_id: stripe_id.to_string(),
        price_id: Some("price_monthly".to_string()),
        status: "active".to_string(),
    }).await?)
}

#[tokio::test]
async fn test_request_refund_derives_organization_and_price() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let sub = subscription(&ctx, "sub_123").await?;

    let refund = ctx.refund_service.request_refund(CreateRefundRequest {
        subscription_id: sub.id,
        refund_id: "re_1".to_string(),
        amount: 4990,
        currency: "BRL".to_string(),
        reason: Some(RefundReason::RequestedByCustomer),
        reference: None,
    }).await?;

    assert_eq!(refund.status, RefundStatus::Pending);
    assert_eq!(refund.organization_id, sub.organization_id);
    assert_eq!(refund.price_id.as_deref(), Some("price_monthly"));
    assert_eq!(refund.currency, "brl");

    assert_eq!(ctx.refund_service.list_by_organization(sub.organization_id).await?.len(), 1);
    assert_eq!(ctx.refund_service.list_by_subscription(sub.id).await?.len(), 1);
    assert_eq!(ctx.refund_service.get(refund.id).await?.refund_id, "re_1");

    Ok(())
}

#[tokio::test]
async fn test_request_refund_for_unknown_subscription() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let err = ctx.refund_service.request_refund(CreateRefundRequest {
        subscription_id: uuid::Uuid::new_v4(),
        refund_id: "re_1".to_string(),
        amount: 100,
        currency: "brl".to_string(),
        reason: None,
        reference: None,
    }).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_processor_update_creates_then_updates() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let sub = subscription(&ctx, "sub_abc").await?;

    let outcome = ctx.refund_service.apply_processor_update(RefundUpdate {
        refund_id: "re_web".to_string(),
        status: Some(RefundStatus::Pending),
        amount: Some(2500),
        currency: Some("brl".to_string()),
        object: Some("refund".to_string()),
        stripe_subscription_id: Some("sub_abc".to_string()),
        ..Default::default()
    }).await?;
    let created = match outcome {
        RefundOutcome::Created(r) => r,
        other => panic!("expected a new refund, got {:?}", other),
    };
    assert_eq!(created.subscription_id, sub.id);

    let outcome = ctx.refund_service.apply_processor_update(RefundUpdate {
        refund_id: "re_web".to_string(),
        status: Some(RefundStatus::Succeeded),
        balance_transaction: Some("txn_1".to_string()),
        ..Default::default()
    }).await?;
    assert!(matches!(outcome, RefundOutcome::Updated(_)));

    let refunds = ctx.refund_service.list_by_subscription(sub.id).await?;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].status, RefundStatus::Succeeded);
    assert_eq!(refunds[0].balance_transaction.as_deref(), Some("txn_1"));
    assert_eq!(refunds[0].amount, 2500);

    Ok(())
}

#[tokio::test]
async fn test_succeeded_refund_amount_is_locked() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let sub = subscription(&ctx, "sub_lock").await?;

    ctx.refund_service.request_refund(CreateRefundRequest {
        subscription_id: sub.id,
        refund_id: "re_lock".to_string(),
        amount: 1000,
        currency: "brl".to_string(),
        reason: None,
        reference: None,
    }).await?;

    ctx.refund_service.apply_processor_update(RefundUpdate {
        refund_id: "re_lock".to_string(),
        status: Some(RefundStatus::Succeeded),
        ..Default::default()
    }).await?;

    ctx.refund_service.apply_processor_update(RefundUpdate {
        refund_id: "re_lock".to_string(),
        status: Some(RefundStatus::Failed),
        amount: Some(1),
        currency: Some("usd".to_string()),
        failure_reason: Some(RefundFailureReason::InsufficientFunds),
        ..Default::default()
    }).await?;

    let refund = &ctx.refund_service.list_by_subscription(sub.id).await?[0];
    assert_eq!(refund.amount, 1000);
    assert_eq!(refund.currency, "brl");
    assert_eq!(refund.status, RefundStatus::Failed);
    assert_eq!(refund.failure_reason, Some(RefundFailureReason::InsufficientFunds));

    Ok(())
}

#[tokio::test]
async fn test_update_for_unknown_subscription_is_ignored() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let outcome = ctx.refund_service.apply_processor_update(RefundUpdate {
        refund_id: "re_orphan".to_string(),
        amount: Some(100),
        currency: Some("brl".to_string()),
        stripe_subscription_id: Some("sub_missing".to_string()),
        ..Default::default()
    }).await?;

    assert!(matches!(outcome, RefundOutcome::Ignored));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_refund_id_conflicts() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let sub = subscription(&ctx, "sub_dup").await?;

    let request = CreateRefundRequest {
        subscription_id: sub.id,
        refund_id: "re_dup".to_string(),
        amount: 1000,
        currency: "brl".to_string(),
        reason: None,
        reference: None,
    };
    ctx.refund_service.request_refund(request.clone()).await?;
    let err = ctx.refund_service.request_refund(request).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}
