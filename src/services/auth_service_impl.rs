//! `SeaORM` implementation of the `AuthService` trait.

use anyhow::Context;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::admin::hash_password;
use crate::db::{Store, Verification};
use crate::services::auth_service::{AuthError, AuthService, BootstrapOutcome};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    fn bootstrap_matches(&self, plaintext: &str) -> bool {
        self.security
            .bootstrap_password
            .as_deref()
            .is_some_and(|expected| constant_time_eq(expected, plaintext))
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn check_password(&self, plaintext: &str) -> Result<bool, AuthError> {
        if let Some(outcome) = self.store.verify_admin_password(plaintext).await? {
            return Ok(outcome == Verification::Match);
        }

        if !self.bootstrap_matches(plaintext) {
            return Ok(false);
        }

        info!("No admin credential stored yet, persisting the bootstrap password");
        self.set_password(plaintext).await?;
        Ok(true)
    }

    async fn set_password(&self, plaintext: &str) -> Result<(), AuthError> {
        let password = plaintext.to_string();
        let security = self.security.clone();

        let hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        self.store.store_admin_hash(hash).await?;
        info!("Admin password updated");
        Ok(())
    }

    async fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        if !self.check_password(current).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let min = self.security.min_password_length;
        if new.chars().count() < min {
            return Err(AuthError::Validation(format!(
                "New password must be at least {min} characters"
            )));
        }

        self.set_password(new).await
    }

    async fn bootstrap(&self) -> Result<BootstrapOutcome, AuthError> {
        let has_credential = self.store.has_admin_credential().await?;

        let outcome = match (has_credential, self.security.bootstrap_password.as_deref()) {
            (false, Some(password)) => {
                self.set_password(password).await?;
                BootstrapOutcome::Persisted
            }
            (false, None) => BootstrapOutcome::Unconfigured,
            (true, Some(_)) => BootstrapOutcome::Ignored,
            (true, None) => BootstrapOutcome::NotNeeded,
        };

        match outcome {
            BootstrapOutcome::Persisted => {
                info!("Stored admin credential from ADMIN_PASSWORD; the variable is no longer needed");
            }
            BootstrapOutcome::Ignored => {
                warn!("ADMIN_PASSWORD is set but an admin credential already exists; it is ignored and should be removed");
            }
            BootstrapOutcome::Unconfigured => {
                warn!("No admin credential stored and ADMIN_PASSWORD is unset; run `complaint-box set-password`");
            }
            BootstrapOutcome::NotNeeded => {}
        }

        Ok(outcome)
    }
}

/// Compares fixed-size digests so the running time does not depend on where
/// the inputs differ.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let left = Sha256::digest(a.as_bytes());
    let right = Sha256::digest(b.as_bytes());

    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc123", "abc1234"));
        assert!(!constant_time_eq("", "x"));
    }
}
