use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Scheme prefix some hosting providers still hand out for PostgreSQL URLs.
const LEGACY_POSTGRES_SCHEME: &str = "postgres://";
const POSTGRES_SCHEME: &str = "postgresql://";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    /// File the config was read from, if any.
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Connection string of the live database (`DATABASE_URL` overrides it).
    pub database_url: String,

    pub log_level: String,

    /// Emit logs as JSON lines instead of the human readable format.
    pub log_json: bool,

    /// Verbose logging, set from `DEBUG`.
    pub debug: bool,

    /// Number of tokio worker threads for `serve` (0 = number of CPU cores)
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:local.db?mode=rwc".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            debug: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Whether to set the Secure flag on session cookies.
    /// Leave off for local development without HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes without a request.
    pub session_idle_minutes: i64,

    pub static_dir: String,

    /// Public submissions accepted per client per minute (0 disables the limit).
    pub submissions_per_minute: u32,

    /// Name stored for complaints submitted without one.
    pub anonymous_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            secure_cookies: false,
            session_idle_minutes: 60,
            static_dir: "static".to_string(),
            submissions_per_minute: 10,
            anonymous_name: "Anonymous".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session signing secret, usually provided through `SECRET_KEY`.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,

    /// One-time admin password used while no credential is stored
    /// (`ADMIN_PASSWORD`).
    #[serde(skip_serializing)]
    pub bootstrap_password: Option<String>,

    /// Argon2 memory cost in KiB
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// Minimum length of a password set through the admin UI.
    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            bootstrap_password: None,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 6,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            loaded_from: None,
        }
    }
}

impl Config {
    /// Loads the config file (if any) and overlays the process environment.
    /// Load `.env` before calling this so its values take part.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults plus the environment, without reading any file.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_file() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.loaded_from = Some(path.to_path_buf());

        Ok(config)
    }

    /// Overlays environment values on top of the file config. `lookup` is
    /// injectable so tests do not have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.general.database_url = url;
        }
        self.general.database_url = normalize_database_url(&self.general.database_url);

        if let Some(password) = non_empty("ADMIN_PASSWORD") {
            self.security.bootstrap_password = Some(password);
        }

        if let Some(secret) = non_empty("SECRET_KEY") {
            self.security.secret_key = Some(secret);
        }

        if let Some(debug) = non_empty("DEBUG") {
            self.general.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(port) = non_empty("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("complaint-box").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_url.trim().is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("Minimum password length must be > 0");
        }

        Ok(())
    }

    /// Log filter used when `RUST_LOG` is not set.
    #[must_use]
    pub fn log_filter(&self) -> String {
        if self.general.debug {
            "debug".to_string()
        } else {
            self.general.log_level.clone()
        }
    }
}

/// Rewrites the legacy `postgres://` scheme to `postgresql://`. Every other
/// URL is returned untouched.
#[must_use]
pub fn normalize_database_url(url: &str) -> String {
    match url.strip_prefix(LEGACY_POSTGRES_SCHEME) {
        Some(rest) => format!("{POSTGRES_SCHEME}{rest}"),
        None => url.to_string(),
    }
}

/// Database URL safe for logs: the password component is masked.
#[must_use]
pub fn redact_database_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}
