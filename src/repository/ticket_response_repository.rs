use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::TicketResponse,
    error::{AppError, Result},
    repository::TicketResponseRepository,
};

#[derive(FromRow)]
struct TicketResponseRow {
    id: String,
    ticket_id: String,
    user_id: String,
    message: String,
    created_at: NaiveDateTime,
}

pub struct SqliteTicketResponseRepository {
    pool: SqlitePool,
}

impl SqliteTicketResponseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_response(row: TicketResponseRow) -> Result<TicketResponse> {
        Ok(TicketResponse {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            ticket_id: Uuid::parse_str(&row.ticket_id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            message: row.message,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl TicketResponseRepository for SqliteTicketResponseRepository {
    async fn create(&self, response: TicketResponse) -> Result<TicketResponse> {
        sqlx::query(
            r#"
            INSERT INTO ticket_responses (id, ticket_id, user_id, message, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#
        )
        .bind(response.id.to_string())
        .bind(response.ticket_id.to_string())
        .bind(response.user_id.to_string())
        .bind(&response.message)
        .bind(response.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(response.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created ticket response".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TicketResponse>> {
        let row = sqlx::query_as::<_, TicketResponseRow>(
            "SELECT id, ticket_id, user_id, message, created_at FROM ticket_responses WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_response).transpose()
    }

    async fn list_by_ticket(&self, ticket_id: Uuid) -> Result<Vec<TicketResponse>> {
        let rows = sqlx::query_as::<_, TicketResponseRow>(
            r#"
            SELECT id, ticket_id, user_id, message, created_at
            FROM ticket_responses
            WHERE ticket_id = ?
            ORDER BY created_at ASC
            "#
        )
        .bind(ticket_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_response)
            .collect()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM ticket_responses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
