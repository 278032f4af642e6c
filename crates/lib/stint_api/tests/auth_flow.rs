//! End-to-end auth flow tests over the full router with in-memory
//! collaborators: login, cookies, the authorization gate, permission
//! checks, refresh, and lockout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use tower::ServiceExt;

use stint_api::config::ApiConfig;
use stint_api::{AppState, router};
use stint_core::audit::AuditLog;
use stint_core::auth::AuthError;
use stint_core::auth::password;
use stint_core::auth::permissions::PermissionResolver;
use stint_core::auth::store::UserStore;
use stint_core::auth::token::TokenCodec;
use stint_core::mail::{MailError, MailSender};
use stint_core::models::activity::ActivityLog;
use stint_core::models::auth::User;

const SECRET: &[u8] = b"test-secret";

struct MemUsers(Mutex<HashMap<i64, User>>);

impl MemUsers {
    fn update(&self, id: i64, f: impl FnOnce(&mut User)) {
        f(self.0.lock().unwrap().get_mut(&id).unwrap());
    }
}

#[async_trait]
impl UserStore for MemUsers {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        let users = self.0.lock().unwrap();
        Ok(users
            .values()
            .find(|u| !u.is_deleted && (u.username == identifier || u.email == identifier))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let users = self.0.lock().unwrap();
        Ok(users.get(&id).filter(|u| !u.is_deleted).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let users = self.0.lock().unwrap();
        let mut all: Vec<User> = users.values().filter(|u| !u.is_deleted).cloned().collect();
        all.sort_by_key(|u| u.id);
        Ok(all)
    }

    async fn save_login_state(
        &self,
        id: i64,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError> {
        self.update(id, |u| {
            u.failed_attempts = failed_attempts;
            u.locked_until = locked_until;
        });
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AuthError> {
        self.update(id, |u| u.password_hash = password_hash.to_string());
        Ok(())
    }
}

struct MemPerms(HashMap<i64, Vec<String>>);

#[async_trait]
impl PermissionResolver for MemPerms {
    async fn effective_permissions(&self, user_id: i64) -> Result<Vec<String>, AuthError> {
        Ok(self.0.get(&user_id).cloned().unwrap_or_default())
    }
}

struct MemAudit(Mutex<Vec<ActivityLog>>);

#[async_trait]
impl AuditLog for MemAudit {
    async fn log_action(&self, user_id: i64, action: &str, details: &str) {
        let mut entries = self.0.lock().unwrap();
        let id = entries.len() as i64 + 1;
        entries.push(ActivityLog {
            id,
            user_id,
            action: action.to_string(),
            details: details.to_string(),
            created_at: Utc::now(),
        });
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>, AuthError> {
        let entries = self.0.lock().unwrap();
        Ok(entries.iter().rev().take(limit as usize).cloned().collect())
    }
}

struct NoopMailer;

#[async_trait]
impl MailSender for NoopMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
        Ok(())
    }
}

fn make_user(id: i64, username: &str, email: &str, pw: &str, role_code: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password::hash_password(pw).unwrap(),
        role_id: Some(1),
        role_code: Some(role_code.to_string()),
        intern_id: None,
        is_active: true,
        is_deleted: false,
        failed_attempts: 0,
        locked_until: None,
        created_at: Utc::now(),
    }
}

struct TestApp {
    app: Router,
    users: Arc<MemUsers>,
    codec: TokenCodec,
}

/// Mentor "alice" (PROJECT_VIEW, FEEDBACK_VIEW) and admin "root"
/// (USER_MANAGE, ACTIVITYLOG_VIEW).
fn test_app() -> TestApp {
    let users = Arc::new(MemUsers(Mutex::new(
        [
            make_user(1, "alice", "alice@example.com", "Secret1!", "MENTOR"),
            make_user(2, "root", "root@example.com", "Sup3r-secret", "ADMIN"),
        ]
        .into_iter()
        .map(|u| (u.id, u))
        .collect(),
    )));
    let perms = Arc::new(MemPerms(HashMap::from([
        (1, vec!["PROJECT_VIEW".to_string(), "FEEDBACK_VIEW".to_string()]),
        (
            2,
            vec!["USER_MANAGE".to_string(), "ACTIVITYLOG_VIEW".to_string()],
        ),
    ])));
    let audit = Arc::new(MemAudit(Mutex::new(vec![])));
    let codec = TokenCodec::new(SECRET);

    let state = AppState::assemble(
        users.clone(),
        perms,
        audit,
        Arc::new(NoopMailer),
        codec.clone(),
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: "postgres://unused".into(),
            jwt_secret: String::from_utf8(SECRET.to_vec()).unwrap(),
        },
    );

    TestApp {
        app: router(state),
        users,
        codec,
    }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("parse JSON")
}

async fn login(app: &Router, identifier: &str, password: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({"identifier": identifier, "password": password}),
        ))
        .await
        .expect("request")
}

async fn login_token(app: &Router, identifier: &str, password: &str) -> String {
    let resp = login(app, identifier, password).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = read_json(resp).await;
    json["accessToken"].as_str().expect("accessToken").to_string()
}

async fn get_with_bearer(app: &Router, uri: &str, token: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request")
}

#[tokio::test]
async fn login_returns_session_and_sets_cookies() {
    let t = test_app();
    let resp = login(&t.app, "alice", "Secret1!").await;

    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<String> = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("stint_access=")));
    assert!(cookies.iter().any(|c| c.starts_with("stint_refresh=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let json = read_json(resp).await;
    assert!(json["accessToken"].is_string());
    assert!(json["refreshToken"].is_string());
    assert_eq!(json["roleCode"], "MENTOR");
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(
        json["permissions"],
        serde_json::json!(["PROJECT_VIEW", "FEEDBACK_VIEW"])
    );
}

#[tokio::test]
async fn login_failures_use_one_generic_message() {
    let t = test_app();

    let wrong_pw = login(&t.app, "alice", "nope").await;
    assert_eq!(wrong_pw.status(), StatusCode::BAD_REQUEST);
    let wrong_pw = read_json(wrong_pw).await;

    let unknown = login(&t.app, "mallory", "nope").await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    let unknown = read_json(unknown).await;

    assert_eq!(wrong_pw["message"], "Invalid username/email or password");
    assert_eq!(unknown["message"], wrong_pw["message"]);
}

#[tokio::test]
async fn me_requires_a_token() {
    let t = test_app();
    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(resp).await["error"], "unauthorized");
}

#[tokio::test]
async fn me_accepts_a_bearer_token() {
    let t = test_app();
    let token = login_token(&t.app, "alice", "Secret1!").await;

    let resp = get_with_bearer(&t.app, "/api/auth/me", &token).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = read_json(resp).await;
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["roleCode"], "MENTOR");
}

#[tokio::test]
async fn me_accepts_a_cookie_token() {
    let t = test_app();
    let token = login_token(&t.app, "alice", "Secret1!").await;

    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(COOKIE, format!("stint_access={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_token_signals_session_expired() {
    let t = test_app();
    let expired_codec = TokenCodec::with_ttls(
        SECRET,
        Duration::seconds(-120),
        Duration::seconds(60),
    );
    let token = expired_codec.issue_access_token(1, "alice", &[]).unwrap();

    let resp = get_with_bearer(&t.app, "/api/auth/me", &token).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(resp).await["error"], "session_expired");
}

#[tokio::test]
async fn garbage_token_is_plain_unauthorized() {
    let t = test_app();
    let resp = get_with_bearer(&t.app, "/api/auth/me", "not.a.token").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(resp).await["error"], "unauthorized");
}

#[tokio::test]
async fn token_of_a_deactivated_user_is_rejected() {
    let t = test_app();
    let token = login_token(&t.app, "alice", "Secret1!").await;

    t.users.update(1, |u| u.is_active = false);

    let resp = get_with_bearer(&t.app, "/api/auth/me", &token).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mentor_is_denied_user_management_but_not_own_session() {
    let t = test_app();
    let token = login_token(&t.app, "alice", "Secret1!").await;

    let denied = get_with_bearer(&t.app, "/api/users", &token).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(denied).await["error"], "forbidden");

    let allowed = get_with_bearer(&t.app, "/api/auth/me", &token).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_snapshot_grants_protected_listings() {
    let t = test_app();
    let token = login_token(&t.app, "root", "Sup3r-secret").await;

    let users = get_with_bearer(&t.app, "/api/users", &token).await;
    assert_eq!(users.status(), StatusCode::OK);
    let json = read_json(users).await;
    assert_eq!(json["users"].as_array().unwrap().len(), 2);

    let logs = get_with_bearer(&t.app, "/api/activity-logs", &token).await;
    assert_eq!(logs.status(), StatusCode::OK);
    let json = read_json(logs).await;
    // The login above was audited.
    assert!(
        json["logs"]
            .as_array()
            .unwrap()
            .iter()
            .any(|l| l["action"] == "LOGIN_SUCCESS")
    );
}

#[tokio::test]
async fn stale_snapshot_falls_back_to_live_permissions() {
    let t = test_app();
    // Token minted with an empty snapshot; the resolver still grants
    // USER_MANAGE to user 2.
    let token = t.codec.issue_access_token(2, "root", &[]).unwrap();

    let resp = get_with_bearer(&t.app, "/api/users", &token).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let t = test_app();
    let resp = login(&t.app, "alice", "Secret1!").await;
    let refresh_token = read_json(resp).await["refreshToken"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(COOKIE, format!("stint_refresh={refresh_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies: Vec<String> = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("stint_access=")));
    assert!(cookies.iter().any(|c| c.starts_with("stint_refresh=")));

    let json = read_json(resp).await;
    assert!(json["accessToken"].is_string());
    assert_eq!(json["user"]["username"], "alice");
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let t = test_app();
    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rejects_an_access_token_in_the_cookie() {
    let t = test_app();
    let access = login_token(&t.app, "alice", "Secret1!").await;

    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(COOKIE, format!("stint_refresh={access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_expires_both_cookies() {
    let t = test_app();
    let token = login_token(&t.app, "alice", "Secret1!").await;

    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies: Vec<String> = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn change_password_end_to_end() {
    let t = test_app();
    let token = login_token(&t.app, "alice", "Secret1!").await;

    let resp = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/change-password")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "oldPassword": "Secret1!",
                        "newPassword": "Another1!"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    // New password logs in; the old one now fails.
    let new_login = login(&t.app, "alice", "Another1!").await;
    assert_eq!(new_login.status(), StatusCode::OK);
    let old_login = login(&t.app, "alice", "Secret1!").await;
    assert_eq!(old_login.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lockout_over_http_reports_the_window() {
    let t = test_app();

    for _ in 0..5 {
        let resp = login(&t.app, "alice", "wrong").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // Even the correct password is refused inside the lockout window, with
    // a message naming the remaining minutes.
    let resp = login(&t.app, "alice", "Secret1!").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = read_json(resp).await;
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("Account locked")
    );
}
