use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};
use tokio::task;
use tracing::warn;

use crate::config::SecurityConfig;
use crate::entities::admin;

/// Why a stored credential did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch,
    /// The stored value is not a PHC hash string.
    UnsupportedHash,
}

pub struct AdminRepository {
    conn: DatabaseConnection,
}

impl AdminRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The credential row: the lowest id wins, any other row is inert.
    pub async fn current(&self) -> Result<Option<admin::Model>> {
        current_in(&self.conn)
            .await
            .context("Failed to query admin credential")
    }

    /// Creates or overwrites the credential hash in a single transaction.
    pub async fn store_hash(&self, password_hash: String) -> Result<()> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start credential transaction")?;

        match current_in(&txn).await? {
            Some(existing) => {
                let mut active: admin::ActiveModel = existing.into();
                active.password_hash = Set(password_hash);
                active.update(&txn).await?;
            }
            None => {
                admin::ActiveModel {
                    id: Set(admin::SINGLETON_ID),
                    password_hash: Set(password_hash),
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit()
            .await
            .context("Failed to commit admin credential")?;
        Ok(())
    }

    /// Verify a password against the stored credential.
    /// Returns `None` when no credential row exists.
    /// Note: Argon2 is CPU-intensive, so verification runs on the blocking pool.
    pub async fn verify(&self, password: &str) -> Result<Option<Verification>> {
        let Some(admin) = self.current().await? else {
            return Ok(None);
        };

        let stored = admin.password_hash;
        let password = password.to_string();

        let outcome = task::spawn_blocking(move || verify_hash(&stored, &password))
            .await
            .context("Password verification task panicked")?;

        if outcome == Verification::UnsupportedHash {
            warn!(
                admin_id = admin.id,
                "Stored admin hash is not an Argon2/PHC string; reset it with `complaint-box set-password`"
            );
        }

        Ok(Some(outcome))
    }
}

async fn current_in<C>(conn: &C) -> Result<Option<admin::Model>, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    admin::Entity::find()
        .order_by_asc(admin::Column::Id)
        .one(conn)
        .await
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None, // output length (use default)
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Params are read from the PHC string, so hashes made with other costs
/// still verify.
#[must_use]
pub fn verify_hash(stored: &str, password: &str) -> Verification {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return Verification::UnsupportedHash;
    };

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    {
        Verification::Match
    } else {
        Verification::Mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("abc123", &cheap_params()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_eq!(verify_hash(&hash, "abc123"), Verification::Match);
        assert_eq!(verify_hash(&hash, "wrong"), Verification::Mismatch);
    }

    #[test]
    fn test_foreign_hash_format_is_unsupported() {
        let werkzeug = "pbkdf2:sha256:600000$salt$0123456789abcdef";
        assert_eq!(verify_hash(werkzeug, "abc123"), Verification::UnsupportedHash);
    }
}
