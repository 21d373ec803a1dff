//! Table creation for the live service and the migration target.
//!
//! Both tables are derived from the entities and created with
//! `IF NOT EXISTS`; existing tables are never altered or dropped.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::debug;

use crate::entities::prelude::*;

pub async fn ensure_tables<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    create_if_absent(conn, Complaint).await?;
    create_if_absent(conn, Admin).await?;
    Ok(())
}

async fn create_if_absent<C, E>(conn: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait + Copy,
{
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let statement = schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned();

    conn.execute(backend.build(&statement)).await?;
    debug!(table = entity.table_name(), "Ensured table exists");
    Ok(())
}
