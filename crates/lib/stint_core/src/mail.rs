//! Outbound mail seam.
//!
//! Delivery is a collaborator concern; the authentication engine only needs
//! `send` and treats every failure as best-effort.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Sends a plain-text message to a single recipient.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Records outbound mail in the log instead of delivering it. Stands in
/// until a real delivery backend is wired up.
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        info!(to, subject, "outbound mail");
        Ok(())
    }
}
