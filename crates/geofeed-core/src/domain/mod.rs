//! Domain entities - the core business objects.

mod comment;
mod engagement;
mod follow;
mod location;
mod post;

pub use comment::{Comment, CommentNode, MAX_COMMENT_DEPTH, MAX_COMMENT_LENGTH, build_thread};
pub use engagement::{
    AuditAction, CounterSync, LikeAuditEvent, LikeState, LikeSummary, TargetRef, TargetType,
    ToggleLikeResult,
};
pub use follow::{FollowCounts, FollowEdge};
pub use location::{Address, LocationLabel, ResolvedPlace};
pub use post::{ClientMeta, MAX_MEDIA_REFS, NearbyPost, NearbyQuery, NewPost, Post, PostView};
