use sea_orm::Set;
use sea_orm::entity::prelude::*;

use geofeed_core::domain::Comment;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub depth: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Comment {
    fn from(model: Model) -> Self {
        Self {
            id: model.comment_id,
            post_id: model.post_id,
            parent_id: model.parent_id,
            author_id: model.author_id,
            content: model.content,
            depth: u32::try_from(model.depth).unwrap_or(0),
            created_at: model.created_at.into(),
        }
    }
}

impl From<&Comment> for ActiveModel {
    fn from(comment: &Comment) -> Self {
        Self {
            comment_id: Set(comment.id),
            post_id: Set(comment.post_id),
            parent_id: Set(comment.parent_id),
            author_id: Set(comment.author_id),
            content: Set(comment.content.clone()),
            depth: Set(i32::try_from(comment.depth).unwrap_or(i32::MAX)),
            created_at: Set(comment.created_at.into()),
        }
    }
}
