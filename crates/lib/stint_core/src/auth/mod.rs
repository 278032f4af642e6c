//! Authentication and authorization logic.
//!
//! Credential verification with brute-force lockout, signed access/refresh
//! tokens, and role→permission resolution.

pub mod engine;
pub mod password;
pub mod permissions;
pub mod store;
pub mod token;

use thiserror::Error;

/// Message returned for unknown identifiers and wrong passwords alike, so
/// responses never reveal which part was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid username/email or password";

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
