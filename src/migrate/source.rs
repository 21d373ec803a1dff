//! Read side of the migration: the local SQLite file.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, QueryResult, Statement};
use std::path::Path;

use crate::db::open_connection;

/// `date_posted` exactly as SQLite stored it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
    /// Any other storage class (only `blob` in practice).
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceComplaint {
    pub id: i32,
    pub name: Option<String>,
    pub content: Option<String>,
    pub date_posted: RawTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAdmin {
    pub id: i32,
    pub password_hash: String,
}

/// Everything read from the source, held in memory for the single pass.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub complaints: Vec<SourceComplaint>,
    pub admins: Vec<SourceAdmin>,
}

/// Opens the file read-only on a single connection.
pub async fn open(path: &Path) -> Result<DatabaseConnection, DbErr> {
    let url = format!("sqlite:{}?mode=ro", path.display());
    open_connection(&url, 1, 1).await
}

pub async fn read_all<C>(conn: &C) -> Result<SourceData, DbErr>
where
    C: ConnectionTrait,
{
    Ok(SourceData {
        complaints: read_complaints(conn).await?,
        admins: read_admins(conn).await?,
    })
}

async fn read_complaints<C>(conn: &C) -> Result<Vec<SourceComplaint>, DbErr>
where
    C: ConnectionTrait,
{
    // typeof() tells us which decoder matches the stored value.
    let rows = conn
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT id, name, content, typeof(date_posted) AS date_kind, date_posted \
             FROM complaint ORDER BY id"
                .to_string(),
        ))
        .await?;

    rows.iter().map(complaint_from_row).collect()
}

fn complaint_from_row(row: &QueryResult) -> Result<SourceComplaint, DbErr> {
    let kind: String = row.try_get("", "date_kind")?;

    let date_posted = match kind.as_str() {
        "integer" => RawTimestamp::Integer(row.try_get("", "date_posted")?),
        "real" => RawTimestamp::Real(row.try_get("", "date_posted")?),
        "text" => RawTimestamp::Text(row.try_get("", "date_posted")?),
        "null" => RawTimestamp::Null,
        other => RawTimestamp::Unsupported(other.to_string()),
    };

    Ok(SourceComplaint {
        id: row.try_get("", "id")?,
        name: row.try_get("", "name")?,
        content: row.try_get("", "content")?,
        date_posted,
    })
}

async fn read_admins<C>(conn: &C) -> Result<Vec<SourceAdmin>, DbErr>
where
    C: ConnectionTrait,
{
    let rows = conn
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT id, password_hash FROM admin ORDER BY id".to_string(),
        ))
        .await?;

    rows.iter()
        .map(|row| {
            Ok(SourceAdmin {
                id: row.try_get("", "id")?,
                password_hash: row.try_get("", "password_hash")?,
            })
        })
        .collect()
}
