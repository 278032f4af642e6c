//! Activity log models.

use chrono::{DateTime, Utc};

/// A recorded audit trail entry.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}
