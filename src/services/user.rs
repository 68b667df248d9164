//! User service
//!
//! Account and session management:
//! - Registration from a `SignupForm`
//! - Login/logout
//! - Session validation and expiry
//!
//! Sessions are opaque UUID v4 tokens stored in the database and carried
//! in the `session` cookie.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::forms::{FormErrors, LoginForm, SignupForm, INVALID_LOGIN, USERNAME_TAKEN};
use crate::models::{Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 14;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// The submitted form is invalid; the messages belong on the page
    #[error("Invalid form")]
    Validation(FormErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Session lifetime, used for the cookie `Max-Age`
    pub fn session_lifetime(&self) -> Duration {
        Duration::days(self.session_expiration_days)
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// - `Validation` for invalid fields or a taken username
    /// - `InternalError` for database errors
    pub async fn register(&self, form: SignupForm) -> Result<User, UserServiceError> {
        let mut errors = form.validate();
        let username = form.username.trim().to_string();

        if !errors.has_field("username")
            && self
                .user_repo
                .get_by_username(&username)
                .await
                .context("Failed to check username")?
                .is_some()
        {
            errors.add("username", USERNAME_TAKEN);
        }

        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        let password_hash = hash_password(&form.password1).context("Failed to hash password")?;

        let created = self
            .user_repo
            .create(&User::new(username, password_hash))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Check credentials and open a new session
    ///
    /// Unknown usernames and wrong passwords produce the same non-field
    /// error.
    pub async fn login(&self, form: LoginForm) -> Result<(User, Session), UserServiceError> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        let invalid = || {
            let mut errors = FormErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            UserServiceError::Validation(errors)
        };

        let user = self
            .user_repo
            .get_by_username(form.username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&form.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(username = %user.username, "Login rejected: wrong password");
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok((user, session))
    }

    /// Logout (invalidate session)
    ///
    /// Unknown tokens are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;

        Ok(user)
    }

    /// Resolve a session token to its user
    ///
    /// Returns `None` for unknown or expired tokens. Expired sessions are
    /// deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Open a session for `user_id` without checking a password
    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + self.session_lifetime(),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::forms::{PASSWORD_MISMATCH, REQUIRED};

    async fn setup_test_service_with_expiration(days: i64) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            days,
        )
    }

    async fn setup_test_service() -> UserService {
        setup_test_service_with_expiration(DEFAULT_SESSION_EXPIRATION_DAYS).await
    }

    fn validation_errors(result: Result<impl std::fmt::Debug, UserServiceError>) -> FormErrors {
        match result {
            Err(UserServiceError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    // ========================================================================
    // Registration tests
    // ========================================================================

    #[tokio::test]
    async fn test_register_hashes_password() {
        let service = setup_test_service().await;

        let user = service
            .register(SignupForm::new("BIBA", "password123"))
            .await
            .expect("Failed to register");

        assert!(user.id > 0);
        assert_eq!(user.username, "BIBA");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_ne!(user.password_hash, "password123");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_fails() {
        let service = setup_test_service().await;

        service.register(SignupForm::new("BIBA", "password123")).await.unwrap();
        let errors = validation_errors(service.register(SignupForm::new("BIBA", "password456")).await);

        assert!(errors.has("username", USERNAME_TAKEN));
    }

    #[tokio::test]
    async fn test_register_invalid_form_fails() {
        let service = setup_test_service().await;

        let mut form = SignupForm::new("", "password123");
        form.password2 = "password124".to_string();
        let errors = validation_errors(service.register(form).await);

        assert!(errors.has("username", REQUIRED));
        assert!(errors.has("password2", PASSWORD_MISMATCH));
    }

    // ========================================================================
    // Login tests
    // ========================================================================

    #[tokio::test]
    async fn test_login_success() {
        let service = setup_test_service().await;
        let registered = service.register(SignupForm::new("BIBA", "password123")).await.unwrap();

        let (user, session) = service
            .login(LoginForm::new("BIBA", "password123"))
            .await
            .expect("Failed to login");

        assert_eq!(user.id, registered.id);
        assert_eq!(session.user_id, registered.id);
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_user_look_the_same() {
        let service = setup_test_service().await;
        service.register(SignupForm::new("BIBA", "password123")).await.unwrap();

        let wrong = validation_errors(service.login(LoginForm::new("BIBA", "wrong")).await);
        let unknown = validation_errors(service.login(LoginForm::new("nobody", "password123")).await);

        assert_eq!(wrong, unknown);
        assert_eq!(wrong.non_field(), [INVALID_LOGIN.to_string()]);
    }

    // ========================================================================
    // Session tests
    // ========================================================================

    #[tokio::test]
    async fn test_validate_session_success() {
        let service = setup_test_service().await;
        let registered = service.register(SignupForm::new("BIBA", "password123")).await.unwrap();
        let session = service.create_session(registered.id).await.unwrap();

        let user = service
            .validate_session(&session.id)
            .await
            .expect("Failed to validate session")
            .expect("User not found");

        assert_eq!(user.username, "BIBA");
        assert!(session.expires_at - session.created_at == Duration::days(14));
    }

    #[tokio::test]
    async fn test_validate_session_nonexistent_returns_none() {
        let service = setup_test_service().await;

        let result = service.validate_session("nonexistent-session-id").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_validate_expired_session_returns_none() {
        let service = setup_test_service_with_expiration(-1).await;
        let registered = service.register(SignupForm::new("BIBA", "password123")).await.unwrap();
        let session = service.create_session(registered.id).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        // Deleted on sight
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let service = setup_test_service().await;
        service.register(SignupForm::new("BIBA", "password123")).await.unwrap();
        let (_, session) = service.login(LoginForm::new("BIBA", "password123")).await.unwrap();

        service.logout(&session.id).await.expect("Failed to logout");
        assert!(service.validate_session(&session.id).await.unwrap().is_none());

        // Unknown tokens are fine too
        assert!(service.logout("nonexistent-session-id").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let service = setup_test_service_with_expiration(-1).await;
        let registered = service.register(SignupForm::new("BIBA", "password123")).await.unwrap();

        service.create_session(registered.id).await.unwrap();
        service.create_session(registered.id).await.unwrap();

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 2);
    }
}
