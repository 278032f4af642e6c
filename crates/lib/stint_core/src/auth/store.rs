//! Credential store — user lookup and login-state persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use crate::models::auth::User;

/// Persistence contract for account records.
///
/// Absence is reported as `None`, never as an error, so callers can produce
/// a uniform authentication failure without revealing which part of the
/// credentials was wrong. Every read excludes soft-deleted rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up by username, falling back to email.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError>;

    /// All non-deleted users, ordered by id.
    async fn list(&self) -> Result<Vec<User>, AuthError>;

    /// Persist lockout counters after a login attempt.
    async fn save_login_state(
        &self,
        id: i64,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError>;

    /// Persist a new password hash.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AuthError>;
}

type UserRow = (
    i64,
    String,
    String,
    String,
    Option<i64>,
    Option<String>,
    Option<i64>,
    bool,
    bool,
    i32,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

const USER_SELECT: &str = "SELECT u.id, u.username, u.email, u.password_hash, u.role_id, \
     r.code, i.id, u.is_active, u.is_deleted, u.failed_attempts, u.locked_until, u.created_at \
     FROM users u \
     LEFT JOIN roles r ON r.id = u.role_id AND r.is_deleted = FALSE \
     LEFT JOIN interns i ON i.user_id = u.id";

fn row_to_user(row: UserRow) -> User {
    let (
        id,
        username,
        email,
        password_hash,
        role_id,
        role_code,
        intern_id,
        is_active,
        is_deleted,
        failed_attempts,
        locked_until,
        created_at,
    ) = row;
    User {
        id,
        username,
        email,
        password_hash,
        role_id,
        role_code,
        intern_id,
        is_active,
        is_deleted,
        failed_attempts,
        locked_until,
        created_at,
    }
}

/// PostgreSQL-backed [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("{USER_SELECT} WHERE u.username = $1 AND u.is_deleted = FALSE");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_user))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("{USER_SELECT} WHERE u.email = $1 AND u.is_deleted = FALSE");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_user))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        if let Some(user) = self.find_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.find_by_email(identifier).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1 AND u.is_deleted = FALSE");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_user))
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let sql = format!("{USER_SELECT} WHERE u.is_deleted = FALSE ORDER BY u.id");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }

    async fn save_login_state(
        &self,
        id: i64,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET failed_attempts = $2, locked_until = $3 WHERE id = $1")
            .bind(id)
            .bind(failed_attempts)
            .bind(locked_until)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
