//! Resolved place labels, keyed by coarse cell prefix.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "location_names")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cell_prefix: String,
    pub display_name: String,
    pub name: String,
    /// Serialized `Address`.
    pub address: Json,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
