use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{WebhookEvent, WebhookSource},
    error::{AppError, Result},
    repository::WebhookEventRepository,
};

#[derive(FromRow)]
struct WebhookEventRow {
    id: String,
    source: String,
    event_type: String,
    external_id: Option<String>,
    payload: String,
    received_at: NaiveDateTime,
    processed_at: Option<NaiveDateTime>,
}

pub struct SqliteWebhookEventRepository {
    pool: SqlitePool,
}

impl SqliteWebhookEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: WebhookEventRow) -> Result<WebhookEvent> {
        Ok(WebhookEvent {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            source: row.source.parse().map_err(AppError::Database)?,
            event_type: row.event_type,
            external_id: row.external_id,
            payload: row.payload,
            received_at: DateTime::from_naive_utc_and_offset(row.received_at, Utc),
            processed_at: row.processed_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        })
    }
}

#[async_trait]
impl WebhookEventRepository for SqliteWebhookEventRepository {
    async fn record(&self, event: WebhookEvent) -> Result<WebhookEvent> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                id, source, event_type, external_id, payload, received_at, processed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(event.id.to_string())
        .bind(event.source.as_str())
        .bind(&event.event_type)
        .bind(&event.external_id)
        .bind(&event.payload)
        .bind(event.received_at.naive_utc())
        .bind(event.processed_at.map(|dt| dt.naive_utc()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>> {
        let row = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            SELECT id, source, event_type, external_id, payload, received_at, processed_at
            FROM webhook_events
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_event).transpose()
    }

    async fn find_by_external_id(&self, source: WebhookSource, external_id: &str) -> Result<Option<WebhookEvent>> {
        let row = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            SELECT id, source, event_type, external_id, payload, received_at, processed_at
            FROM webhook_events
            WHERE source = ? AND external_id = ?
            ORDER BY received_at ASC
            LIMIT 1
            "#
        )
        .bind(source.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_event).transpose()
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE webhook_events SET processed_at = ? WHERE id = ?")
            .bind(at.naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_received_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE received_at < ?")
            .bind(cutoff.naive_utc())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
