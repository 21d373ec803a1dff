use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set};

use crate::entities::complaint;

/// Complaint as shown in the admin listing.
#[derive(Debug, Clone)]
pub struct Complaint {
    pub id: i32,
    pub name: Option<String>,
    pub content: Option<String>,
    pub date_posted: Option<NaiveDateTime>,
}

impl From<complaint::Model> for Complaint {
    fn from(model: complaint::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            content: model.content,
            date_posted: model.date_posted,
        }
    }
}

pub struct ComplaintRepository {
    conn: DatabaseConnection,
}

impl ComplaintRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Store a new submission stamped with the current local time.
    pub async fn add(&self, name: &str, content: &str) -> Result<Complaint> {
        let model = complaint::ActiveModel {
            name: Set(Some(name.to_string())),
            content: Set(Some(content.to_string())),
            date_posted: Set(Some(Local::now().naive_local())),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert complaint")?;

        Ok(Complaint::from(model))
    }

    /// All complaints, newest first.
    pub async fn list_recent(&self) -> Result<Vec<Complaint>> {
        let rows = complaint::Entity::find()
            .order_by_desc(complaint::Column::DatePosted)
            .order_by_desc(complaint::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list complaints")?;

        Ok(rows.into_iter().map(Complaint::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        complaint::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count complaints")
    }
}
