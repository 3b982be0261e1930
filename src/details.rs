//! Thread detail view: thread -> comments -> replies, with like counts and
//! soft-delete redaction applied at read time.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{debug, warn};

use crate::error::DetailsError;
use crate::models::*;
use crate::repo::{CommentLikeRepo, CommentReplyRepo, CommentRepo, Repo, ThreadRepo, UserRepo};

/// Shown in place of a soft-deleted comment's content.
pub const COMMENT_DELETED_CONTENT: &str = "**komentar telah dihapus**";
/// Shown in place of a soft-deleted reply's content.
pub const REPLY_DELETED_CONTENT: &str = "**balasan telah dihapus**";

/// Display content for a stored row. Storage keeps the original text.
pub fn redact(stored: String, is_deleted: bool, sentinel: &str) -> String {
    if is_deleted { sentinel.to_string() } else { stored }
}

#[derive(Clone)]
pub struct ThreadDetailsAssembler {
    users: Arc<dyn UserRepo>,
    threads: Arc<dyn ThreadRepo>,
    comments: Arc<dyn CommentRepo>,
    replies: Arc<dyn CommentReplyRepo>,
    likes: Arc<dyn CommentLikeRepo>,
}

impl ThreadDetailsAssembler {
    pub fn new(
        users: Arc<dyn UserRepo>,
        threads: Arc<dyn ThreadRepo>,
        comments: Arc<dyn CommentRepo>,
        replies: Arc<dyn CommentReplyRepo>,
        likes: Arc<dyn CommentLikeRepo>,
    ) -> Self {
        Self { users, threads, comments, replies, likes }
    }

    /// All five lookups served by one backend.
    pub fn from_repo<R: Repo + 'static>(repo: Arc<R>) -> Self {
        Self {
            users: repo.clone(),
            threads: repo.clone(),
            comments: repo.clone(),
            replies: repo.clone(),
            likes: repo,
        }
    }

    /// Builds the nested view for `thread_id`.
    ///
    /// Output order follows the order the comment and reply lookups return,
    /// even though per-comment and per-reply lookups run concurrently. The
    /// first failing lookup aborts the whole assembly.
    pub async fn assemble(&self, thread_id: &str) -> Result<ThreadDetails, DetailsError> {
        debug!(thread_id, "assembling thread details");
        let thread = self
            .threads
            .get_thread_by_id(thread_id)
            .await?
            .ok_or_else(|| DetailsError::NotFound("Thread not found".into()))?;
        let username = self.username_of(&thread.user_id).await?;

        let rows = self.comments.get_comments_by_thread_id(&thread.id).await?;
        let comments = if rows.is_empty() {
            Vec::new()
        } else {
            let like_counts = self.likes.get_comment_like_counts(&thread.id).await?;
            try_join_all(rows.into_iter().map(|c| self.comment_details(c, &like_counts))).await?
        };
        debug!(thread_id, comments = comments.len(), "thread details assembled");

        Ok(ThreadDetails {
            id: thread.id,
            title: thread.title,
            body: thread.body,
            date: thread.created_at,
            username,
            comments,
        })
    }

    async fn comment_details(
        &self,
        comment: Comment,
        like_counts: &HashMap<Id, i64>,
    ) -> Result<CommentDetails, DetailsError> {
        let username = self.username_of(&comment.user_id).await?;
        let replies = self.reply_details(&comment.id).await?;
        Ok(CommentDetails {
            like_count: like_counts.get(&comment.id).copied().unwrap_or(0),
            content: redact(comment.content, comment.is_deleted, COMMENT_DELETED_CONTENT),
            id: comment.id,
            date: comment.created_at,
            username,
            replies,
        })
    }

    // A deleted parent comment does not redact its replies.
    async fn reply_details(&self, comment_id: &str) -> Result<Vec<CommentReplyDetails>, DetailsError> {
        let rows = self.replies.get_replies_by_comment_id(comment_id).await?;
        try_join_all(rows.into_iter().map(|reply| async move {
            let username = self.username_of(&reply.user_id).await?;
            Ok::<_, DetailsError>(CommentReplyDetails {
                content: redact(reply.content, reply.is_deleted, REPLY_DELETED_CONTENT),
                id: reply.id,
                date: reply.created_at,
                username,
            })
        }))
        .await
    }

    async fn username_of(&self, user_id: &str) -> Result<String, DetailsError> {
        match self.users.get_user_by_id(user_id).await? {
            Some(user) if !user.username.is_empty() => Ok(user.username),
            _ => {
                warn!(user_id, "referenced user cannot be resolved");
                Err(DetailsError::DataInconsistency("User not found".into()))
            }
        }
    }
}
