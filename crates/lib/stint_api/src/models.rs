//! API request/response models.
//!
//! Wire DTOs are camelCase, distinct from the domain models in
//! `stint_core::models`.

use serde::{Deserialize, Serialize};

use stint_core::models::activity::ActivityLog;
use stint_core::models::auth::{Session, User};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role_code: Option<String>,
    pub intern_id: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role_code: user.role_code.clone(),
            intern_id: user.intern_id,
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Body of login and refresh responses. Tokens are additionally set as
/// http-only cookies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserInfo,
    pub permissions: Vec<String>,
    pub role_code: Option<String>,
    pub intern_id: Option<i64>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            user: UserInfo::from(&session.user),
            permissions: session.permissions.clone(),
            role_code: session.user.role_code.clone(),
            intern_id: session.user.intern_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserInfo,
    pub permissions: Vec<String>,
    pub role_code: Option<String>,
    pub intern_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogInfo {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub details: String,
    pub created_at: String,
}

impl From<&ActivityLog> for ActivityLogInfo {
    fn from(log: &ActivityLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            action: log.action.clone(),
            details: log.details.clone(),
            created_at: log.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityLogListResponse {
    pub logs: Vec<ActivityLogInfo>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserInfo>,
}
