//! Initial roles, permission catalog, and admin account.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::AuthError;
use crate::auth::password;

/// Default admin credentials created by [`seed`]. Meant to be changed on
/// first login.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_EMAIL: &str = "admin@stint.local";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin123!";

/// The full permission catalog: (code, name).
const PERMISSIONS: &[(&str, &str)] = &[
    ("VIEW_DASHBOARD", "View dashboard"),
    ("EXPORT_REPORT", "Export report"),
    ("VIEW_STATISTIC", "View statistics"),
    ("VIEW_REPORT", "View report"),
    ("INTERN_CREATE", "Create intern"),
    ("INTERN_VIEW", "View intern list"),
    ("INTERN_UPDATE", "Update intern"),
    ("INTERN_DELETE", "Delete intern"),
    ("INTERN_VIEW_PROJECTS", "View projects of an intern"),
    ("PROJECT_CREATE", "Create project"),
    ("PROJECT_VIEW", "View project"),
    ("PROJECT_UPDATE", "Update project"),
    ("PROJECT_DELETE", "Delete project"),
    ("PROJECT_ASSIGN_INTERN", "Assign intern to project"),
    ("PROJECT_VIEW_INTERNS", "View interns of a project"),
    ("FEEDBACK_CREATE_PROJECT", "Intern feedback to project"),
    ("FEEDBACK_VIEW", "View feedback"),
    ("FEEDBACK_UPDATE", "Update feedback"),
    ("FEEDBACK_DELETE", "Delete feedback"),
    ("EVALUATE_INTERN", "Mentor evaluate intern"),
    ("EVALUATE_PROJECT", "Mentor evaluate project"),
    ("TRAININGPLAN_CREATE", "Create training plan"),
    ("TRAININGPLAN_VIEW", "View training plan"),
    ("TRAININGPLAN_UPDATE", "Update training plan"),
    ("TRAININGPLAN_DELETE", "Delete training plan"),
    ("USER_MANAGE", "Manage users"),
    ("ROLE_MANAGE", "Manage roles"),
    ("ACTIVITYLOG_VIEW", "View activity log"),
];

const MENTOR_PERMISSIONS: &[&str] = &[
    "VIEW_DASHBOARD",
    "EXPORT_REPORT",
    "VIEW_STATISTIC",
    "VIEW_REPORT",
    "INTERN_VIEW",
    "INTERN_VIEW_PROJECTS",
    "PROJECT_CREATE",
    "PROJECT_VIEW",
    "PROJECT_UPDATE",
    "PROJECT_ASSIGN_INTERN",
    "PROJECT_VIEW_INTERNS",
    "FEEDBACK_VIEW",
    "FEEDBACK_UPDATE",
    "EVALUATE_INTERN",
    "EVALUATE_PROJECT",
    "TRAININGPLAN_CREATE",
    "TRAININGPLAN_VIEW",
    "TRAININGPLAN_UPDATE",
];

const INTERN_PERMISSIONS: &[&str] = &[
    "VIEW_DASHBOARD",
    "PROJECT_VIEW",
    "FEEDBACK_VIEW",
    "FEEDBACK_CREATE_PROJECT",
    "INTERN_VIEW_PROJECTS",
    "TRAININGPLAN_VIEW",
];

/// Seed roles, the permission catalog, role assignments, and the initial
/// admin account. Safe to run repeatedly: existing rows are kept.
pub async fn seed(pool: &PgPool) -> Result<(), AuthError> {
    let admin_role = upsert_role(pool, "ADMIN", "Admin", "System administrator").await?;
    let mentor_role = upsert_role(pool, "MENTOR", "Mentor", "Trainer / Mentor").await?;
    let intern_role = upsert_role(pool, "INTERN", "Intern", "Intern user").await?;

    for (code, name) in PERMISSIONS {
        let permission = upsert_permission(pool, code, name).await?;
        grant(pool, admin_role, permission).await?;
        if MENTOR_PERMISSIONS.contains(code) {
            grant(pool, mentor_role, permission).await?;
        }
        if INTERN_PERMISSIONS.contains(code) {
            grant(pool, intern_role, permission).await?;
        }
    }

    ensure_admin_user(pool, admin_role).await?;

    info!("database seeded");
    Ok(())
}

async fn upsert_role(
    pool: &PgPool,
    code: &str,
    name: &str,
    description: &str,
) -> Result<i64, AuthError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO roles (code, name, description) VALUES ($1, $2, $3) \
         ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(code)
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_permission(pool: &PgPool, code: &str, name: &str) -> Result<i64, AuthError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO permissions (code, name) VALUES ($1, $2) \
         ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(code)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn grant(pool: &PgPool, role_id: i64, permission_id: i64) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(role_id)
    .bind(permission_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn ensure_admin_user(pool: &PgPool, admin_role: i64) -> Result<(), AuthError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
    )
    .bind(DEFAULT_ADMIN_USERNAME)
    .fetch_one(pool)
    .await?;
    if exists {
        return Ok(());
    }

    let hash = password::hash_password(DEFAULT_ADMIN_PASSWORD)?;
    sqlx::query("INSERT INTO users (username, email, password_hash, role_id) VALUES ($1, $2, $3, $4)")
        .bind(DEFAULT_ADMIN_USERNAME)
        .bind(DEFAULT_ADMIN_EMAIL)
        .bind(&hash)
        .bind(admin_role)
        .execute(pool)
        .await?;

    warn!(
        username = DEFAULT_ADMIN_USERNAME,
        "created default admin account; change its password after first login"
    );
    Ok(())
}
