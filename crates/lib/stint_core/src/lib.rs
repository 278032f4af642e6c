//! # stint_core
//!
//! Core domain logic for Stint: credential storage, token issuance,
//! permission resolution, and the authentication engine.

pub mod audit;
pub mod auth;
pub mod mail;
pub mod migrate;
pub mod models;
pub mod seed;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
