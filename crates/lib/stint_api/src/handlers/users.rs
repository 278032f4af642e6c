//! User administration request handlers.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{UserInfo, UserListResponse};

/// `GET /api/users` — list all accounts. Requires the `USER_MANAGE`
/// permission.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<UserListResponse>> {
    current
        .require(state.permissions.as_ref(), "USER_MANAGE")
        .await?;

    let users = state.users.list().await?;
    Ok(Json(UserListResponse {
        users: users.iter().map(UserInfo::from).collect(),
    }))
}
