//! Activity log — audit trail of security-relevant actions.
//!
//! Writes are fire-and-forget: a failed insert is logged and swallowed so
//! an audit problem never turns a successful operation into an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use crate::auth::AuthError;
use crate::models::activity::ActivityLog;

pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";
pub const LOGIN_LOCKED: &str = "LOGIN_LOCKED";
pub const CHANGE_PASSWORD: &str = "CHANGE_PASSWORD";

/// Audit trail sink and reader.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an action. Implementations log failures instead of raising.
    async fn log_action(&self, user_id: i64, action: &str, details: &str);

    /// Most recent entries, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>, AuthError>;
}

/// PostgreSQL-backed [`AuditLog`] over the `activity_logs` table.
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ActivityRow = (i64, i64, String, String, DateTime<Utc>);

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn log_action(&self, user_id: i64, action: &str, details: &str) {
        let result =
            sqlx::query("INSERT INTO activity_logs (user_id, action, details) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(action)
                .bind(details)
                .execute(&self.pool)
                .await;
        if let Err(e) = result {
            warn!(error = %e, user_id, action, "failed to write activity log");
        }
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>, AuthError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, user_id, action, details, created_at \
             FROM activity_logs ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, user_id, action, details, created_at)| ActivityLog {
                id,
                user_id,
                action,
                details,
                created_at,
            })
            .collect())
    }
}
