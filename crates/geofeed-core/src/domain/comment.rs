use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deepest allowed reply level; top-level comments have depth 1.
pub const MAX_COMMENT_DEPTH: u32 = 3;

/// Longest accepted comment body, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// Comment entity - a reply to a post or to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        post_id: Uuid,
        parent: Option<&Comment>,
        author_id: Uuid,
        content: String,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            post_id,
            parent_id: parent.map(|p| p.id),
            author_id,
            content,
            depth: parent.map_or(1, |p| p.depth + 1),
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// A comment with its replies nested beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Assemble flat rows into reply trees without recursion.
///
/// Rows are indexed into an arena, children are linked by index, and nodes
/// are materialized in post-order using an explicit stack. A reply whose
/// parent is not among `rows` is promoted to a root. Sibling order follows
/// the input order.
pub fn build_thread(rows: Vec<Comment>) -> Vec<CommentNode> {
    let index: HashMap<Uuid, usize> = rows.iter().enumerate().map(|(i, c)| (c.id, i)).collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match row.parent_id.and_then(|p| index.get(&p)) {
            Some(&parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let mut slots: Vec<Option<Comment>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = vec![None; slots.len()];

    // (node, children_pushed)
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            let replies = children[node]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            if let Some(comment) = slots[node].take() {
                built[node] = Some(CommentNode { comment, replies });
            }
        } else {
            stack.push((node, true));
            for &child in children[node].iter().rev() {
                stack.push((child, false));
            }
        }
    }

    roots.into_iter().filter_map(|r| built[r].take()).collect()
}
