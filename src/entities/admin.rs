use sea_orm::entity::prelude::*;

/// Id used when the credential row is first created. Lookups go by lowest
/// id, so rows carried over with other ids keep working.
pub const SINGLETON_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Argon2id password hash (PHC string)
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub password_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
