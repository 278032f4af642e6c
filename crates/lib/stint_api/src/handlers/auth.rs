//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{ApiError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::{
    ChangePasswordRequest, LoginRequest, MeResponse, MessageResponse, SessionResponse, UserInfo,
};
use crate::services::cookies;
use stint_core::models::auth::Session;

fn session_cookies(jar: CookieJar, session: &Session, state: &AppState) -> CookieJar {
    jar.add(cookies::access_cookie(
        &session.access_token,
        state.codec.access_ttl_secs(),
    ))
    .add(cookies::refresh_cookie(
        &session.refresh_token,
        state.codec.refresh_ttl_secs(),
    ))
}

/// `POST /api/auth/login` — authenticate with username/email + password.
///
/// Tokens are returned in the body and set as http-only cookies.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    if body.identifier.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "identifier and password are required".into(),
        ));
    }

    let session = state.auth.login(&body.identifier, &body.password).await?;
    let jar = session_cookies(jar, &session, &state);
    Ok((jar, Json(SessionResponse::from(&session))))
}

/// `POST /api/auth/refresh` — exchange the refresh-token cookie for a
/// rotated token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let token = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".into()))?;

    let session = state.auth.refresh(&token).await?;
    let jar = session_cookies(jar, &session, &state);
    Ok((jar, Json(SessionResponse::from(&session))))
}

/// `GET /api/auth/me` — current session info for the authenticated user.
pub async fn me_handler(Extension(current): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        role_code: current.user.role_code.clone(),
        intern_id: current.user.intern_id,
        user: UserInfo::from(&current.user),
        permissions: current.permissions,
    })
}

/// `POST /api/auth/logout` — clear both auth cookies.
///
/// Tokens are stateless, so there is nothing to revoke server-side.
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar
        .add(cookies::clear_access_cookie())
        .add(cookies::clear_refresh_cookie());
    (
        jar,
        Json(MessageResponse {
            message: "Logged out".into(),
        }),
    )
}

/// `POST /api/auth/change-password` — change the caller's own password.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "oldPassword and newPassword are required".into(),
        ));
    }

    state
        .auth
        .change_password(current.user.id, &body.old_password, &body.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".into(),
    }))
}
