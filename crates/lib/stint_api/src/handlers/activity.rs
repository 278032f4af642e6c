//! Activity log request handlers.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{ActivityLogInfo, ActivityLogListResponse};

/// How many entries the listing returns.
const ACTIVITY_LOG_LIMIT: i64 = 100;

/// `GET /api/activity-logs` — most recent audit entries. Requires the
/// `ACTIVITYLOG_VIEW` permission.
pub async fn list_activity_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ActivityLogListResponse>> {
    current
        .require(state.permissions.as_ref(), "ACTIVITYLOG_VIEW")
        .await?;

    let logs = state.audit.recent(ACTIVITY_LOG_LIMIT).await?;
    Ok(Json(ActivityLogListResponse {
        logs: logs.iter().map(ActivityLogInfo::from).collect(),
    }))
}
