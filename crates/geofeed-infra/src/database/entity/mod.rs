//! SeaORM entities, one per table. The three `posts_by_*` tables carry the
//! same payload under different primary keys.

pub mod comment_counts;
pub mod comments;
pub mod follow_counts;
pub mod followers;
pub mod follows;
pub mod like_audit;
pub mod like_state;
pub mod location_names;
pub mod posts_by_author;
pub mod posts_by_cell;
pub mod posts_by_id;

use sea_orm::prelude::Json;

pub(crate) fn media_refs_to_json(refs: &[String]) -> Json {
    Json::from(refs.to_vec())
}

/// Non-string entries are dropped.
pub(crate) fn media_refs_from_json(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}
