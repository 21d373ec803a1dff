//! Write side of the migration. Rows keep their source ids.

use chrono::NaiveDateTime;
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, EntityName, Statement, Value};
use tracing::{debug, warn};

use super::source::SourceAdmin;
use super::transform::{NormalizedTimestamp, TargetComplaint, parse_iso8601};
use crate::entities::{admin, complaint};

pub async fn insert_complaint<C>(conn: &C, row: &TargetComplaint) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();

    let date_posted: SimpleExpr = match &row.date_posted {
        NormalizedTimestamp::Parsed(dt) => Expr::val(*dt).into(),
        NormalizedTimestamp::Deferred(raw) => deferred_timestamp(conn, raw).await?,
        NormalizedTimestamp::Null => Expr::val(None::<NaiveDateTime>).into(),
        NormalizedTimestamp::Failed { reason } => {
            warn!(complaint_id = row.id, %reason, "Unreadable date_posted, storing NULL");
            Expr::val(None::<NaiveDateTime>).into()
        }
    };

    let insert = Query::insert()
        .into_table(complaint::Entity)
        .columns([
            complaint::Column::Id,
            complaint::Column::Name,
            complaint::Column::Content,
            complaint::Column::DatePosted,
        ])
        .values([
            row.id.into(),
            row.name.clone().into(),
            row.content.clone().into(),
            date_posted,
        ])
        .map_err(|e| DbErr::Custom(e.to_string()))?
        .to_owned();

    conn.execute(backend.build(&insert)).await?;
    debug!(complaint_id = row.id, "Migrated complaint");
    Ok(())
}

/// Raw text the destination has to coerce itself. PostgreSQL casts it in the
/// insert. SQLite has no timestamp type, so the text goes through its
/// `datetime()` first and a NULL result fails the row.
async fn deferred_timestamp<C>(conn: &C, raw: &str) -> Result<SimpleExpr, DbErr>
where
    C: ConnectionTrait,
{
    match conn.get_database_backend() {
        DbBackend::Postgres => {
            Ok(Expr::cust_with_values("CAST(? AS TIMESTAMP)", [raw.to_string()]).into())
        }
        DbBackend::Sqlite => {
            let row = conn
                .query_one(Statement::from_sql_and_values(
                    DbBackend::Sqlite,
                    "SELECT datetime(?) AS coerced",
                    [Value::from(raw)],
                ))
                .await?;

            let coerced: Option<String> = match row {
                Some(row) => row.try_get("", "coerced")?,
                None => None,
            };

            coerced
                .as_deref()
                .and_then(parse_iso8601)
                .map(|dt| SimpleExpr::from(Expr::val(dt)))
                .ok_or_else(|| DbErr::Custom(format!("cannot convert '{raw}' to a timestamp")))
        }
        backend => Err(DbErr::Custom(format!(
            "cannot convert '{raw}' to a timestamp on {backend:?}"
        ))),
    }
}

pub async fn insert_admin<C>(conn: &C, row: &SourceAdmin) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let insert = Query::insert()
        .into_table(admin::Entity)
        .columns([admin::Column::Id, admin::Column::PasswordHash])
        .values([row.id.into(), row.password_hash.clone().into()])
        .map_err(|e| DbErr::Custom(e.to_string()))?
        .to_owned();

    let backend = conn.get_database_backend();
    conn.execute(backend.build(&insert)).await?;
    debug!(admin_id = row.id, "Migrated admin credential row");
    Ok(())
}

/// Explicit ids do not advance PostgreSQL serial sequences; move them past
/// the highest migrated id so live inserts do not collide.
pub async fn resync_sequences<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    if conn.get_database_backend() != DbBackend::Postgres {
        return Ok(());
    }

    for table in [
        complaint::Entity.table_name(),
        admin::Entity.table_name(),
    ] {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE((SELECT MAX(id) FROM \"{table}\"), 0) + 1, false)"
        );
        conn.execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;
        debug!(table, "Resynced id sequence");
    }

    Ok(())
}
