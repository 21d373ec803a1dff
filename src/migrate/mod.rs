//! One-shot copy of a local SQLite database into the live database.
//!
//! The run is strictly sequential: ensure the target schema, read the source
//! into memory, check the target is empty (or clear it with `force`), then
//! insert every row with its original id. A failed insert stops the run;
//! rows written before it stay in place.

pub mod guard;
pub mod source;
pub mod transform;
pub mod writer;

use sea_orm::{DatabaseConnection, DbErr};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{normalize_database_url, redact_database_url};
use crate::db::{open_connection, schema};
use guard::{GuardDecision, TargetCounts};
use transform::NormalizedTimestamp;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("target database URL is required (use --target or set DATABASE_URL)")]
    MissingTarget,

    #[error("sqlite file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to connect to target database: {0}")]
    Connect(#[source] DbErr),

    #[error("failed to read source database: {0}")]
    Source(#[source] DbErr),

    #[error(
        "target database already has data (complaint rows: {complaints}, admin rows: {admins}); use --force to overwrite"
    )]
    Conflict { complaints: u64, admins: u64 },

    #[error("target database error: {0}")]
    Target(#[source] DbErr),

    #[error("failed to write complaint {id}: {source}")]
    WriteComplaint { id: i32, source: DbErr },

    #[error("failed to write admin row {id}: {source}")]
    WriteAdmin { id: i32, source: DbErr },
}

impl MigrateError {
    /// Process exit code reported by the `migrate` command.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MissingTarget | Self::SourceNotFound(_) => 2,
            Self::Conflict { .. } => 3,
            Self::Connect(_)
            | Self::Source(_)
            | Self::Target(_)
            | Self::WriteComplaint { .. }
            | Self::WriteAdmin { .. } => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub source: PathBuf,
    pub target: Option<String>,
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub complaints: usize,
    pub admins: usize,
    /// Rows found in the target and deleted because of `force`.
    pub cleared: Option<TargetCounts>,
    /// Timestamps handed to the destination as raw text.
    pub deferred_timestamps: usize,
    /// Timestamps that could not be read and were stored as NULL.
    pub failed_timestamps: usize,
}

pub async fn run(options: &MigrationOptions) -> Result<MigrationReport, MigrateError> {
    let target_url = options
        .target
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(normalize_database_url)
        .ok_or(MigrateError::MissingTarget)?;

    if !options.source.is_file() {
        return Err(MigrateError::SourceNotFound(options.source.clone()));
    }

    info!(
        source = %options.source.display(),
        target = %redact_database_url(&target_url),
        force = options.force,
        "Starting migration"
    );

    let target = open_connection(&target_url, 1, 1)
        .await
        .map_err(MigrateError::Connect)?;

    let result = match schema::ensure_tables(&target).await {
        Ok(()) => migrate_from_source(options, &target).await,
        Err(e) => Err(MigrateError::Connect(e)),
    };

    close(target, "target").await;
    result
}

async fn migrate_from_source(
    options: &MigrationOptions,
    target: &DatabaseConnection,
) -> Result<MigrationReport, MigrateError> {
    let source_conn = source::open(&options.source)
        .await
        .map_err(MigrateError::Source)?;

    let data = source::read_all(&source_conn)
        .await
        .map_err(MigrateError::Source);
    close(source_conn, "source").await;

    transfer(data?, target, options.force).await
}

async fn transfer(
    data: source::SourceData,
    target: &DatabaseConnection,
    force: bool,
) -> Result<MigrationReport, MigrateError> {
    info!(
        "Found {} complaint(s) and {} admin row(s) in source",
        data.complaints.len(),
        data.admins.len()
    );

    let counts = guard::count_rows(target)
        .await
        .map_err(MigrateError::Target)?;

    let mut report = MigrationReport::default();

    if guard::evaluate(counts, force)? == GuardDecision::ClearThenProceed {
        guard::clear(target, counts)
            .await
            .map_err(MigrateError::Target)?;
        report.cleared = Some(counts);
    }

    for row in data.complaints {
        let row = transform::transform_complaint(row);

        match &row.date_posted {
            NormalizedTimestamp::Deferred(_) => report.deferred_timestamps += 1,
            NormalizedTimestamp::Failed { .. } => report.failed_timestamps += 1,
            NormalizedTimestamp::Parsed(_) | NormalizedTimestamp::Null => {}
        }

        writer::insert_complaint(target, &row)
            .await
            .map_err(|source| MigrateError::WriteComplaint { id: row.id, source })?;
        report.complaints += 1;
    }

    for row in &data.admins {
        writer::insert_admin(target, row)
            .await
            .map_err(|source| MigrateError::WriteAdmin { id: row.id, source })?;
        report.admins += 1;
    }

    writer::resync_sequences(target)
        .await
        .map_err(MigrateError::Target)?;

    info!(
        complaints = report.complaints,
        admins = report.admins,
        "Migration completed"
    );

    Ok(report)
}

async fn close(conn: DatabaseConnection, which: &str) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close {which} connection: {e}");
    }
}
