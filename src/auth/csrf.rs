use sqlx::SqlitePool;
use subtle::ConstantTimeEq;

use super::{generate_token, hash_token};
use crate::error::{AppError, Result};

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Per-session CSRF tokens. The raw token goes to the client, only its hash is kept.
pub struct CsrfService {
    pool: SqlitePool,
}

impl CsrfService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a fresh token for the session, replacing any previous one.
    pub async fn issue(&self, session_id: &str) -> Result<String> {
        let token = generate_token();

        sqlx::query(
            r#"
            INSERT INTO csrf_tokens (session_id, token_hash, created_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(session_id) DO UPDATE SET
                token_hash = excluded.token_hash,
                created_at = CURRENT_TIMESTAMP
            "#
        )
        .bind(session_id)
        .bind(hash_token(&token))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(token)
    }

    pub async fn verify(&self, session_id: &str, token: &str) -> Result<bool> {
        let stored = sqlx::query_scalar::<_, String>(
            "SELECT token_hash FROM csrf_tokens WHERE session_id = ?"
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(match stored {
            Some(stored) => stored.as_bytes().ct_eq(hash_token(token).as_bytes()).into(),
            None => false,
        })
    }

    pub async fn revoke(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM csrf_tokens WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

/// Paths excused from CSRF checks, written as `stripe/*` style patterns where
/// `*` matches any run of characters. Leading slashes are ignored on both sides.
#[derive(Debug, Clone, Default)]
pub struct CsrfExemptions {
    patterns: Vec<String>,
}

impl CsrfExemptions {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().trim_start_matches('/').to_string())
                .collect(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.patterns.iter().any(|pattern| wildcard_match(pattern, path))
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No wildcard at all: exact match
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
