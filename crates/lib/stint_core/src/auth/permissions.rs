//! Role→permission resolution and authorization checks.

use async_trait::async_trait;
use sqlx::PgPool;

use super::AuthError;

/// Answers authorization queries for a user's single assigned role.
///
/// Fail-closed: a missing, deleted, or inactive user resolves to an empty
/// permission set rather than an error, and a deleted role grants nothing.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Codes of all non-deleted permissions attached to the user's
    /// non-deleted role. Empty when the user is missing, inactive,
    /// deleted, or has no role.
    async fn effective_permissions(&self, user_id: i64) -> Result<Vec<String>, AuthError>;

    async fn user_has(&self, user_id: i64, code: &str) -> Result<bool, AuthError> {
        Ok(self
            .effective_permissions(user_id)
            .await?
            .iter()
            .any(|c| c == code))
    }

    /// Canonical guard used by every protected operation.
    async fn ensure(&self, user_id: i64, code: &str) -> Result<(), AuthError> {
        if self.user_has(user_id, code).await? {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!(
                "Missing permission: {code}"
            )))
        }
    }
}

/// PostgreSQL-backed [`PermissionResolver`].
pub struct PgPermissionResolver {
    pool: PgPool,
}

impl PgPermissionResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionResolver for PgPermissionResolver {
    async fn effective_permissions(&self, user_id: i64) -> Result<Vec<String>, AuthError> {
        let codes = sqlx::query_scalar::<_, String>(
            "SELECT p.code FROM users u \
             JOIN roles r ON r.id = u.role_id AND r.is_deleted = FALSE \
             JOIN role_permissions rp ON rp.role_id = r.id \
             JOIN permissions p ON p.id = rp.permission_id AND p.is_deleted = FALSE \
             WHERE u.id = $1 AND u.is_deleted = FALSE AND u.is_active \
             ORDER BY p.code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }
}
