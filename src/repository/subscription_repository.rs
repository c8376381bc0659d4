use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateSubscriptionRequest, Subscription},
    error::{AppError, Result},
    repository::SubscriptionRepository,
};

#[derive(FromRow)]
struct SubscriptionRow {
    id: String,
    organization_id: String,
    stripe_subscription_id: String,
    price_id: Option<String>,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteSubscriptionRepository {
    pool: SqlitePool,
}

impl SqliteSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_subscription(row: SubscriptionRow) -> Result<Subscription> {
        Ok(Subscription {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            organization_id: Uuid::parse_str(&row.organization_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            stripe_subscription_id: row.stripe_subscription_id,
            price_id: row.price_id,
            status: row.status,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepository {
    async fn create(&self, request: CreateSubscriptionRequest) -> Result<Subscription> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, organization_id, stripe_subscription_id, price_id,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(request.organization_id.to_string())
        .bind(&request.stripe_subscription_id)
        .bind(&request.price_id)
        .bind(&request.status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created subscription".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, organization_id, stripe_subscription_id, price_id,
                   status, created_at, updated_at
            FROM subscriptions
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_subscription).transpose()
    }

    async fn find_by_stripe_id(&self, stripe_subscription_id: &str) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, organization_id, stripe_subscription_id, price_id,
                   status, created_at, updated_at
            FROM subscriptions
            WHERE stripe_subscription_id = ?
            "#
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_subscription).transpose()
    }
}
