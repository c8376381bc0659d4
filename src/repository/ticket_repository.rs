use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Ticket, TicketFilter, TicketSort, TicketStatus, TicketSummary},
    error::{AppError, Result},
    repository::TicketRepository,
};

const SUMMARY_SELECT: &str = r#"
    SELECT t.id, t.organization_id, t.user_id, t.title, t.description,
           t.status, t.ticket_type, t.priority, t.files, t.image_path,
           t.created_at, t.updated_at, t.closed_at,
           o.name AS organization_name, u.name AS user_name
    FROM tickets t
    JOIN organizations o ON o.id = t.organization_id
    JOIN users u ON u.id = t.user_id
"#;

#[derive(FromRow)]
struct TicketRow {
    id: String,
    organization_id: String,
    user_id: String,
    title: String,
    description: String,
    status: String,
    ticket_type: String,
    priority: String,
    files: String,
    image_path: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    closed_at: Option<NaiveDateTime>,
}

#[derive(FromRow)]
struct TicketSummaryRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    organization_name: String,
    user_name: String,
}

pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_ticket(row: TicketRow) -> Result<Ticket> {
        Ok(Ticket {
            id: parse_uuid(&row.id)?,
            organization_id: parse_uuid(&row.organization_id)?,
            user_id: parse_uuid(&row.user_id)?,
            title: row.title,
            description: row.description,
            status: row.status.parse().map_err(AppError::Database)?,
            ticket_type: row.ticket_type.parse().map_err(AppError::Database)?,
            priority: row.priority.parse().map_err(AppError::Database)?,
            files: serde_json::from_str(&row.files)
                .map_err(|e| AppError::Database(format!("Invalid files column: {}", e)))?,
            image_path: row.image_path,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
            closed_at: row.closed_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        })
    }

    fn row_to_summary(row: TicketSummaryRow) -> Result<TicketSummary> {
        Ok(TicketSummary {
            ticket: Self::row_to_ticket(row.ticket)?,
            organization_name: row.organization_name,
            user_name: row.user_name,
        })
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
        builder.push(" WHERE 1 = 1");
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder
                .push(" AND t.search_title LIKE '%' || ")
                .push_bind(escape_like(&search.to_lowercase()))
                .push(" || '%' ESCAPE '\\'");
        }
        if let Some(status) = filter.status {
            builder.push(" AND t.status = ").push_bind(status.as_str());
        }
    }

    fn files_to_json(files: &[String]) -> Result<String> {
        serde_json::to_string(files).map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// SQLite only folds ASCII case, so titles are matched against a column
/// lowercased in Rust.
fn search_key(title: &str) -> String {
    title.to_lowercase()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn create(&self, ticket: Ticket) -> Result<Ticket> {
        let files_json = Self::files_to_json(&ticket.files)?;

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, organization_id, user_id, title, search_title, description,
                status, ticket_type, priority, files, image_path,
                created_at, updated_at, closed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(ticket.id.to_string())
        .bind(ticket.organization_id.to_string())
        .bind(ticket.user_id.to_string())
        .bind(&ticket.title)
        .bind(search_key(&ticket.title))
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.ticket_type.as_str())
        .bind(ticket.priority.as_str())
        .bind(&files_json)
        .bind(&ticket.image_path)
        .bind(ticket.created_at.naive_utc())
        .bind(ticket.updated_at.naive_utc())
        .bind(ticket.closed_at.map(|dt| dt.naive_utc()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(ticket.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created ticket".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, organization_id, user_id, title, description,
                   status, ticket_type, priority, files, image_path,
                   created_at, updated_at, closed_at
            FROM tickets
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_ticket).transpose()
    }

    async fn find_summary(&self, id: Uuid) -> Result<Option<TicketSummary>> {
        let sql = format!("{} WHERE t.id = ?", SUMMARY_SELECT);
        let row = sqlx::query_as::<_, TicketSummaryRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_summary).transpose()
    }

    async fn list(&self, filter: &TicketFilter, now: DateTime<Utc>) -> Result<Vec<TicketSummary>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SUMMARY_SELECT);
        Self::push_filters(&mut builder, filter);

        builder.push(" ORDER BY ");
        match filter.sort {
            TicketSort::Id => builder.push("t.id"),
            TicketSort::Organization => builder.push("o.name"),
            TicketSort::User => builder.push("u.name"),
            TicketSort::Title => builder.push("t.title"),
            TicketSort::Status => builder.push("t.status"),
            TicketSort::Priority => builder.push("t.priority"),
            TicketSort::Type => builder.push("t.ticket_type"),
            TicketSort::Lifetime => builder
                .push("(julianday(COALESCE(t.closed_at, ")
                .push_bind(now.naive_utc())
                .push(")) - julianday(t.created_at))"),
            TicketSort::CreatedAt => builder.push("t.created_at"),
            TicketSort::ClosedAt => builder.push("t.closed_at"),
            TicketSort::UpdatedAt => builder.push("t.updated_at"),
        };
        builder
            .push(" ")
            .push(filter.direction.as_sql())
            .push(", t.id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = builder
            .build_query_as::<TicketSummaryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_summary)
            .collect()
    }

    async fn count(&self, filter: &TicketFilter) -> Result<i64> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM tickets t");
        Self::push_filters(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn count_open(&self) -> Result<i64> {
        let [first, second] = TicketStatus::TERMINAL;
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE status NOT IN (?, ?)"
        )
        .bind(first.as_str())
        .bind(second.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count)
    }

    async fn update(&self, ticket: Ticket) -> Result<Ticket> {
        let files_json = Self::files_to_json(&ticket.files)?;

        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET organization_id = ?,
                user_id = ?,
                title = ?,
                search_title = ?,
                description = ?,
                status = ?,
                ticket_type = ?,
                priority = ?,
                files = ?,
                image_path = ?,
                updated_at = ?,
                closed_at = ?
            WHERE id = ?
            "#
        )
        .bind(ticket.organization_id.to_string())
        .bind(ticket.user_id.to_string())
        .bind(&ticket.title)
        .bind(search_key(&ticket.title))
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.ticket_type.as_str())
        .bind(ticket.priority.as_str())
        .bind(&files_json)
        .bind(&ticket.image_path)
        .bind(ticket.updated_at.naive_utc())
        .bind(ticket.closed_at.map(|dt| dt.naive_utc()))
        .bind(ticket.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Ticket not found".to_string()));
        }

        self.find_by_id(ticket.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated ticket".to_string())
        })
    }

    async fn attachment_in_use(&self, path: &str, except: Option<Uuid>) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tickets t
            WHERE t.id != COALESCE(?, '')
              AND (t.image_path = ?
                   OR EXISTS (SELECT 1 FROM json_each(t.files) WHERE json_each.value = ?))
            "#
        )
        .bind(except.map(|id| id.to_string()))
        .bind(path)
        .bind(path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();

        // Responses go first so the delete doesn't depend on foreign_keys being on
        sqlx::query("DELETE FROM ticket_responses WHERE ticket_id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM tickets WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
