//! Authentication domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// Account record backing authentication.
///
/// `role_code` and `intern_id` are resolved alongside the row so login and
/// session payloads never need a second lookup.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Option<i64>,
    pub role_code: Option<String>,
    pub intern_id: Option<i64>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Claims carried by a signed access token.
///
/// `perms` is the permission snapshot captured at issuance time; it goes
/// stale if a permission is revoked mid-lifetime, bounded by the access
/// token TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject — user id (standard JWT `sub` claim).
    pub sub: String,
    pub username: String,
    /// Permission codes at issuance time.
    pub perms: Vec<String>,
    /// Type discriminator, always `access`.
    pub token_use: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    /// Parse the subject back into a user id.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::TokenInvalid)
    }
}

/// Claims carried by a signed refresh token. No permission snapshot; a
/// refresh always re-reads current permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    /// Type discriminator, always `refresh`.
    pub token_use: String,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    /// Parse the subject back into a user id.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::TokenInvalid)
    }
}

/// Result of a successful login or refresh: a fresh token pair plus the
/// resolved identity and permission snapshot.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    pub permissions: Vec<String>,
}
