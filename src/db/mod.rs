use anyhow::{Context, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::redact_database_url;

pub mod repositories;
pub mod schema;

pub use repositories::admin::Verification;
pub use repositories::complaint::Complaint;

/// Opens a pooled connection with the timeouts used everywhere in the app.
pub async fn open_connection(
    db_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt).await
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    /// Connects and makes sure both tables exist.
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        if let Some(path) = sqlite_file_path(db_url) {
            if let Some(parent) = Path::new(path).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }

        let conn = open_connection(db_url, max_connections, min_connections)
            .await
            .with_context(|| format!("Failed to connect to {}", redact_database_url(db_url)))?;

        schema::ensure_tables(&conn)
            .await
            .context("Failed to create tables")?;

        info!(
            "Database connected at {} (pool: {}-{})",
            redact_database_url(db_url),
            min_connections,
            max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    fn complaint_repo(&self) -> repositories::complaint::ComplaintRepository {
        repositories::complaint::ComplaintRepository::new(self.conn.clone())
    }

    fn admin_repo(&self) -> repositories::admin::AdminRepository {
        repositories::admin::AdminRepository::new(self.conn.clone())
    }

    pub async fn add_complaint(&self, name: &str, content: &str) -> Result<Complaint> {
        self.complaint_repo().add(name, content).await
    }

    pub async fn list_complaints(&self) -> Result<Vec<Complaint>> {
        self.complaint_repo().list_recent().await
    }

    pub async fn count_complaints(&self) -> Result<u64> {
        self.complaint_repo().count().await
    }

    pub async fn has_admin_credential(&self) -> Result<bool> {
        Ok(self.admin_repo().current().await?.is_some())
    }

    pub async fn store_admin_hash(&self, password_hash: String) -> Result<()> {
        self.admin_repo().store_hash(password_hash).await
    }

    pub async fn verify_admin_password(&self, password: &str) -> Result<Option<Verification>> {
        self.admin_repo().verify(password).await
    }
}

/// File path of a `sqlite:` URL, `None` for in-memory or other backends.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url.strip_prefix("sqlite:")?;
    let rest = rest.trim_start_matches("//");
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(path)
    }
}
