//! Request authorization gate.
//!
//! Authenticates a caller from a bearer or cookie token, re-resolves the
//! account, and attaches the request-scoped identity to the request
//! extensions for downstream handlers.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::ApiError;
use crate::services::cookies::ACCESS_COOKIE;
use stint_core::auth::permissions::PermissionResolver;
use stint_core::models::auth::User;

/// Authenticated caller, attached to request extensions by [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Permission snapshot embedded in the presented access token.
    pub permissions: Vec<String>,
}

impl CurrentUser {
    /// Check `code` against the token snapshot first (fast path); fall back
    /// to a live lookup so permissions granted after token issuance are
    /// still honored (slow path).
    pub async fn require(
        &self,
        resolver: &dyn PermissionResolver,
        code: &str,
    ) -> Result<(), ApiError> {
        if self.permissions.iter().any(|c| c == code) {
            return Ok(());
        }
        resolver.ensure(self.user.id, code).await.map_err(ApiError::from)
    }
}

/// Axum middleware guarding every protected route.
///
/// Token source: `Authorization: Bearer <token>` header, falling back to
/// the access cookie. A token is only as valid as the account it names:
/// decoded claims are re-checked against the credential store before the
/// request proceeds.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    let token = bearer
        .or_else(|| jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| ApiError::Unauthorized("Missing or invalid authorization header".into()))?;

    let claims = state.codec.decode_access(&token).map_err(ApiError::from)?;

    let user_id = claims.user_id().map_err(ApiError::from)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(ApiError::from)?
        .filter(|u| !u.is_deleted && u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".into()))?;

    request.extensions_mut().insert(CurrentUser {
        user,
        permissions: claims.perms,
    });

    Ok(next.run(request).await)
}
