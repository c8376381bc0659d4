use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::SubscriptionRefund,
    error::{AppError, Result},
    repository::RefundRepository,
};

const REFUND_COLUMNS: &str = r#"
    id, subscription_id, organization_id, price_id, refund_id, status,
    currency, balance_transaction, amount, reason, object, reference,
    reference_status, failure_reason, created_at, updated_at
"#;

#[derive(FromRow)]
struct RefundRow {
    id: String,
    subscription_id: String,
    organization_id: String,
    price_id: Option<String>,
    refund_id: String,
    status: String,
    currency: String,
    balance_transaction: Option<String>,
    amount: i64,
    reason: Option<String>,
    object: Option<String>,
    reference: Option<String>,
    reference_status: Option<String>,
    failure_reason: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteRefundRepository {
    pool: SqlitePool,
}

impl SqliteRefundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_refund(row: RefundRow) -> Result<SubscriptionRefund> {
        Ok(SubscriptionRefund {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            subscription_id: Uuid::parse_str(&row.subscription_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            organization_id: Uuid::parse_str(&row.organization_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            price_id: row.price_id,
            refund_id: row.refund_id,
            status: row.status.parse().map_err(AppError::Database)?,
            currency: row.currency,
            balance_transaction: row.balance_transaction,
            amount: row.amount,
            reason: row.reason.map(|r| r.parse()).transpose().map_err(AppError::Database)?,
            object: row.object,
            reference: row.reference,
            reference_status: row.reference_status,
            failure_reason: row
                .failure_reason
                .map(|r| r.parse())
                .transpose()
                .map_err(AppError::Database)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn fetch_many(&self, column: &str, value: String) -> Result<Vec<SubscriptionRefund>> {
        let sql = format!(
            "SELECT {} FROM subscription_refunds WHERE {} = ? ORDER BY created_at DESC",
            REFUND_COLUMNS, column
        );
        let rows = sqlx::query_as::<_, RefundRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_refund)
            .collect()
    }

    async fn fetch_one(&self, column: &str, value: String) -> Result<Option<SubscriptionRefund>> {
        let sql = format!(
            "SELECT {} FROM subscription_refunds WHERE {} = ?",
            REFUND_COLUMNS, column
        );
        let row = sqlx::query_as::<_, RefundRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_refund).transpose()
    }
}

#[async_trait]
impl RefundRepository for SqliteRefundRepository {
    async fn create(&self, refund: SubscriptionRefund) -> Result<SubscriptionRefund> {
        sqlx::query(
            r#"
            INSERT INTO subscription_refunds (
                id, subscription_id, organization_id, price_id, refund_id, status,
                currency, balance_transaction, amount, reason, object, reference,
                reference_status, failure_reason, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(refund.id.to_string())
        .bind(refund.subscription_id.to_string())
        .bind(refund.organization_id.to_string())
        .bind(&refund.price_id)
        .bind(&refund.refund_id)
        .bind(refund.status.as_str())
        .bind(&refund.currency)
        .bind(&refund.balance_transaction)
        .bind(refund.amount)
        .bind(refund.reason.map(|r| r.as_str()))
        .bind(&refund.object)
        .bind(&refund.reference)
        .bind(&refund.reference_status)
        .bind(refund.failure_reason.map(|r| r.as_str()))
        .bind(refund.created_at.naive_utc())
        .bind(refund.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Refund {} already recorded", refund.refund_id))
            }
            other => AppError::Database(other.to_string()),
        })?;

        self.find_by_id(refund.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created refund".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionRefund>> {
        self.fetch_one("id", id.to_string()).await
    }

    async fn find_by_refund_id(&self, refund_id: &str) -> Result<Option<SubscriptionRefund>> {
        self.fetch_one("refund_id", refund_id.to_string()).await
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<SubscriptionRefund>> {
        self.fetch_many("organization_id", organization_id.to_string()).await
    }

    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<SubscriptionRefund>> {
        self.fetch_many("subscription_id", subscription_id.to_string()).await
    }

    async fn update(&self, refund: SubscriptionRefund) -> Result<SubscriptionRefund> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_refunds
            SET status = ?,
                currency = ?,
                balance_transaction = ?,
                amount = ?,
                reason = ?,
                object = ?,
                reference = ?,
                reference_status = ?,
                failure_reason = ?,
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(refund.status.as_str())
        .bind(&refund.currency)
        .bind(&refund.balance_transaction)
        .bind(refund.amount)
        .bind(refund.reason.map(|r| r.as_str()))
        .bind(&refund.object)
        .bind(&refund.reference)
        .bind(&refund.reference_status)
        .bind(refund.failure_reason.map(|r| r.as_str()))
        .bind(refund.updated_at.naive_utc())
        .bind(refund.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Refund not found".to_string()));
        }

        self.find_by_id(refund.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated refund".to_string())
        })
    }
}
