use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Prefixed string ids ("thread-…", "comment-…")
pub type Id = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub fullname: Option<String>,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub fullname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Thread {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Id, // owner
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Id,
    pub thread_id: Id,
    pub is_deleted: bool, // soft delete marker, content kept as written
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentReply {
    pub id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Id,
    pub comment_id: Id,
    pub is_deleted: bool, // soft delete marker
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommentReply {
    pub content: String,
}

/// One row of the per-thread like aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LikeCount {
    pub comment_id: Id,
    pub count: i64,
}

// ---------------- read model ----------------
//
// Built once by `ThreadDetailsAssembler`; fields are public for serialization
// and assertions but nothing hands out `&mut` to them.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentReplyDetails {
    pub id: Id,
    pub content: String,
    pub date: DateTime<Utc>,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentDetails {
    pub id: Id,
    pub content: String,
    pub date: DateTime<Utc>,
    pub username: String,
    #[serde(rename = "likeCount")]
    pub like_count: i64,
    pub replies: Vec<CommentReplyDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadDetails {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub comments: Vec<CommentDetails>,
}
