//! Domain service for the shared admin credential.
//!
//! Handles password checks, rotation, and the one-time bootstrap password.

use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// What [`AuthService::bootstrap`] did at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No credential existed; the bootstrap password was stored.
    Persisted,
    /// A credential already exists, the bootstrap password is ignored.
    Ignored,
    /// No credential and no bootstrap password: nobody can log in yet.
    Unconfigured,
    /// A credential exists and no bootstrap password is set.
    NotNeeded,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks a password against the stored credential.
    ///
    /// While no credential exists, a matching bootstrap password is accepted
    /// and persisted as the credential.
    async fn check_password(&self, plaintext: &str) -> Result<bool, AuthError>;

    /// Creates or overwrites the stored credential.
    async fn set_password(&self, plaintext: &str) -> Result<(), AuthError>;

    /// Rotates the password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if `current` is wrong and
    /// [`AuthError::Validation`] if `new` is too short.
    async fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError>;

    /// Persists the bootstrap password when no credential exists yet.
    async fn bootstrap(&self) -> Result<BootstrapOutcome, AuthError>;
}
