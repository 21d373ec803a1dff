//! Set-password command handler

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use thiserror::Error;

use crate::cli::SetPasswordArgs;
use crate::config::{Config, normalize_database_url};
use crate::db::Store;
use crate::services::{AuthError, AuthService, SeaOrmAuthService};

/// Shortest password the reset command accepts.
pub const MIN_RESET_PASSWORD_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("Failed to read password interactively. Use --password to pass it as an argument.")]
    Unreadable,

    #[error("Password must be at least 4 characters long (choose a stronger password for production).")]
    TooShort,

    #[error("preparing credential store: {0:#}")]
    Store(anyhow::Error),

    #[error("setting admin password: {0}")]
    Persist(#[from] AuthError),
}

impl ResetError {
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Unreadable | Self::TooShort => 2,
            Self::Store(_) | Self::Persist(_) => 1,
        }
    }
}

pub async fn cmd_set_password(config: &Config, args: SetPasswordArgs) -> ExitCode {
    let password = match args.password {
        Some(password) => Ok(password),
        None => prompt_password(),
    };

    let result = match password {
        Ok(password) => reset_password(config, &password, args.target.as_deref()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            println!("Admin password set successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Validates `password` and stores its hash as the admin credential in
/// `target` (or the configured database).
pub async fn reset_password(
    config: &Config,
    password: &str,
    target: Option<&str>,
) -> Result<(), ResetError> {
    if password.chars().count() < MIN_RESET_PASSWORD_LEN {
        return Err(ResetError::TooShort);
    }

    let db_url = target
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map_or_else(|| config.general.database_url.clone(), normalize_database_url);

    let store = Store::with_pool_options(&db_url, 1, 1)
        .await
        .map_err(ResetError::Store)?;

    let auth = SeaOrmAuthService::new(store.clone(), config.security.clone());
    let result = auth.set_password(password).await;

    if let Err(e) = store.close().await {
        tracing::warn!("Failed to close database connection: {e:#}");
    }

    result.map_err(ResetError::from)
}

/// Reads one line from stdin. The input is echoed; pass `--password` where
/// that matters.
fn prompt_password() -> Result<String, ResetError> {
    print!("New admin password: ");
    io::stdout().flush().map_err(|_| ResetError::Unreadable)?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|_| ResetError::Unreadable)?;

    if read == 0 {
        return Err(ResetError::Unreadable);
    }

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_short_password_rejected_before_connecting() {
        let mut config = Config::default();
        config.general.database_url = "postgresql://unreachable.invalid/db".to_string();

        let err = reset_password(&config, "abc", None).await.unwrap_err();
        assert!(matches!(err, ResetError::TooShort));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ResetError::Unreadable.exit_code(), 2);
        assert_eq!(ResetError::Store(anyhow::anyhow!("down")).exit_code(), 1);
        assert_eq!(
            ResetError::Persist(AuthError::Database("locked".to_string())).exit_code(),
            1
        );
    }
}
