//! # stint_api
//!
//! HTTP API library for Stint.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use stint_core::audit::{AuditLog, PgAuditLog};
use stint_core::auth::engine::AuthEngine;
use stint_core::auth::permissions::{PermissionResolver, PgPermissionResolver};
use stint_core::auth::store::{PgUserStore, UserStore};
use stint_core::auth::token::TokenCodec;
use stint_core::mail::{LogMailer, MailSender};

use crate::config::ApiConfig;

/// Shared application state passed to all handlers.
///
/// Collaborators are trait objects so tests can wire in-memory fakes
/// through [`AppState::assemble`].
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthEngine>,
    pub users: Arc<dyn UserStore>,
    pub permissions: Arc<dyn PermissionResolver>,
    pub audit: Arc<dyn AuditLog>,
    pub codec: TokenCodec,
    pub config: ApiConfig,
}

impl AppState {
    /// Wire a Postgres-backed state (production composition).
    pub fn postgres(pool: PgPool, config: ApiConfig) -> Self {
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
        let permissions: Arc<dyn PermissionResolver> =
            Arc::new(PgPermissionResolver::new(pool.clone()));
        let audit: Arc<dyn AuditLog> = Arc::new(PgAuditLog::new(pool));
        let mailer: Arc<dyn MailSender> = Arc::new(LogMailer);
        let codec = TokenCodec::new(config.jwt_secret.as_bytes());
        Self::assemble(users, permissions, audit, mailer, codec, config)
    }

    /// Wire explicit collaborators.
    pub fn assemble(
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionResolver>,
        audit: Arc<dyn AuditLog>,
        mailer: Arc<dyn MailSender>,
        codec: TokenCodec,
        config: ApiConfig,
    ) -> Self {
        let auth = Arc::new(AuthEngine::new(
            users.clone(),
            permissions.clone(),
            codec.clone(),
            audit.clone(),
            mailer,
        ));
        Self {
            auth,
            users,
            permissions,
            audit,
            codec,
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `stint_core::migrate::migrate()` which owns the migration
/// files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    stint_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/auth/login", post(handlers::auth::login_handler))
        .route("/api/auth/refresh", post(handlers::auth::refresh_handler));

    // Protected routes (behind the authorization gate)
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::me_handler))
        .route("/api/auth/logout", post(handlers::auth::logout_handler))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password_handler),
        )
        .route(
            "/api/activity-logs",
            get(handlers::activity::list_activity_handler),
        )
        .route("/api/users", get(handlers::users::list_users_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
