//! Authentication engine — credential checks, lockout, token issuance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::password;
use super::permissions::PermissionResolver;
use super::store::UserStore;
use super::token::TokenCodec;
use super::{AuthError, INVALID_CREDENTIALS};
use crate::audit::{self, AuditLog};
use crate::mail::MailSender;
use crate::models::auth::{Session, User};

/// Brute-force lockout policy.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Failed attempts before the account locks.
    pub max_failed_attempts: i32,
    /// How long the account stays locked.
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::minutes(15),
        }
    }
}

/// Verifies credentials, enforces the lockout policy, and issues token
/// pairs. Collaborators are injected so storage, audit, and mail can vary
/// per deployment.
pub struct AuthEngine {
    users: Arc<dyn UserStore>,
    permissions: Arc<dyn PermissionResolver>,
    codec: TokenCodec,
    audit: Arc<dyn AuditLog>,
    mailer: Arc<dyn MailSender>,
    policy: LockoutPolicy,
}

impl AuthEngine {
    pub fn new(
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionResolver>,
        codec: TokenCodec,
        audit: Arc<dyn AuditLog>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            users,
            permissions,
            codec,
            audit,
            mailer,
            policy: LockoutPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LockoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Authenticate with username or email plus password.
    ///
    /// Unknown identifiers and wrong passwords fail with the same generic
    /// message. A locked account is rejected before the password is
    /// checked, so lockout responses carry no credential signal.
    pub async fn login(&self, identifier: &str, password_input: &str) -> Result<Session, AuthError> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| AuthError::BadRequest(INVALID_CREDENTIALS.into()))?;

        if let Some(locked_until) = user.locked_until
            && locked_until > Utc::now()
        {
            return Err(AuthError::PermissionDenied(lockout_message(locked_until)));
        }

        if user.is_deleted || !user.is_active {
            return Err(AuthError::PermissionDenied(
                "User is inactive or deleted".into(),
            ));
        }

        if !password::verify_password(password_input, &user.password_hash)? {
            return self.register_failure(&user).await;
        }

        self.users.save_login_state(user.id, 0, None).await?;
        self.audit
            .log_action(
                user.id,
                audit::LOGIN_SUCCESS,
                &format!("User {} logged in", user.username),
            )
            .await;
        self.issue_session(user).await
    }

    /// Exchange a refresh token for a brand-new token pair.
    ///
    /// The permission snapshot is re-read, so refresh is the mechanism that
    /// bounds snapshot staleness.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let claims = match self.codec.decode_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired) => {
                return Err(AuthError::Unauthorized("Refresh token expired".into()));
            }
            Err(_) => return Err(AuthError::Unauthorized("Invalid refresh token".into())),
        };

        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .filter(|u| !u.is_deleted && u.is_active)
            .ok_or_else(|| AuthError::Unauthorized("User not found or inactive".into()))?;

        self.issue_session(user).await
    }

    /// Change a user's password after re-verifying the current one.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))?;

        if user.is_deleted || !user.is_active {
            return Err(AuthError::PermissionDenied(
                "User is inactive or deleted".into(),
            ));
        }

        if !password::verify_password(old_password, &user.password_hash)? {
            return Err(AuthError::Validation("Current password is incorrect".into()));
        }

        if old_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".into(),
            ));
        }

        password::validate_strong_password(new_password)?;

        let hash = password::hash_password(new_password)?;
        self.users.update_password(user.id, &hash).await?;

        self.audit
            .log_action(
                user.id,
                audit::CHANGE_PASSWORD,
                "Password changed successfully",
            )
            .await;

        self.send_best_effort(
            &user.email,
            "Password changed successfully",
            &format!(
                "Hello {},\n\n\
                 Your password has been changed successfully.\n\
                 If you did not make this change, please contact support immediately.",
                user.username
            ),
        )
        .await;

        Ok(())
    }

    /// Wrong password: bump the counter, lock when the threshold is
    /// reached, always fail with the generic credential message.
    async fn register_failure(&self, user: &User) -> Result<Session, AuthError> {
        let attempts = user.failed_attempts + 1;
        let locked_until = (attempts >= self.policy.max_failed_attempts)
            .then(|| Utc::now() + self.policy.lock_duration);

        self.users
            .save_login_state(user.id, attempts, locked_until)
            .await?;

        if locked_until.is_some() {
            self.audit
                .log_action(
                    user.id,
                    audit::LOGIN_LOCKED,
                    &format!("Account locked after {attempts} failed login attempts"),
                )
                .await;
            self.send_best_effort(
                &user.email,
                "Account locked",
                &format!(
                    "Hello {},\n\n\
                     Your account has been locked for {} minutes after {attempts} failed \
                     login attempts.\n\
                     If this was not you, please contact an administrator.",
                    user.username,
                    self.policy.lock_duration.num_minutes()
                ),
            )
            .await;
        }

        Err(AuthError::BadRequest(INVALID_CREDENTIALS.into()))
    }

    async fn issue_session(&self, user: User) -> Result<Session, AuthError> {
        let permissions = self.permissions.effective_permissions(user.id).await?;
        let access_token = self
            .codec
            .issue_access_token(user.id, &user.username, &permissions)?;
        let refresh_token = self.codec.issue_refresh_token(user.id)?;
        Ok(Session {
            access_token,
            refresh_token,
            user,
            permissions,
        })
    }

    /// Mail failures never fail the surrounding flow.
    async fn send_best_effort(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.mailer.send(to, subject, body).await {
            warn!(error = %e, to, "mail send failed");
        }
    }
}

fn lockout_message(locked_until: DateTime<Utc>) -> String {
    let remaining = locked_until - Utc::now();
    let minutes = (remaining.num_seconds() + 59) / 60;
    format!("Account locked. Try again in {} minute(s)", minutes.max(1))
}
