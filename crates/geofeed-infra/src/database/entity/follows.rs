//! Outgoing edges, partitioned by follower.

use sea_orm::entity::prelude::*;

use geofeed_core::domain::FollowEdge;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub follower_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub following_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for FollowEdge {
    fn from(model: Model) -> Self {
        Self {
            follower_id: model.follower_id,
            following_id: model.following_id,
            created_at: model.created_at.into(),
        }
    }
}
