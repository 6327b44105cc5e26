//! Canonical post view, keyed by post id.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use geofeed_core::domain::{ClientMeta, Post};

use super::{media_refs_from_json, media_refs_to_json};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "posts_by_id")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub post_id: Uuid,
    pub author_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub media_refs: Json,
    pub latitude: f64,
    pub longitude: f64,
    pub cell: String,
    pub cell_prefix: String,
    pub created_at: DateTimeWithTimeZone,
    pub origin_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Post {
    fn from(model: Model) -> Self {
        Self {
            id: model.post_id,
            author_id: model.author_id,
            media_refs: media_refs_from_json(&model.media_refs),
            content: model.content,
            latitude: model.latitude,
            longitude: model.longitude,
            cell: model.cell,
            cell_prefix: model.cell_prefix,
            created_at: model.created_at.into(),
        }
    }
}

impl ActiveModel {
    pub fn from_post(post: &Post, meta: &ClientMeta) -> Self {
        Self {
            post_id: Set(post.id),
            author_id: Set(post.author_id),
            content: Set(post.content.clone()),
            media_refs: Set(media_refs_to_json(&post.media_refs)),
            latitude: Set(post.latitude),
            longitude: Set(post.longitude),
            cell: Set(post.cell.clone()),
            cell_prefix: Set(post.cell_prefix.clone()),
            created_at: Set(post.created_at.into()),
            origin_address: Set(meta.origin_address.clone()),
            user_agent: Set(meta.user_agent.clone()),
        }
    }
}
