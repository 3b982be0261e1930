use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("forbidden")] Forbidden,
    #[error("internal error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// `user-3f2a…`: kind prefix plus a simple-form v4 UUID.
pub fn new_id(prefix: &str) -> Id {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn add_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user_by_id(&self, id: &str) -> RepoResult<Option<User>>;
}

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn add_thread(&self, new: NewThread, owner_id: &str) -> RepoResult<Thread>;
    async fn get_thread_by_id(&self, id: &str) -> RepoResult<Option<Thread>>;
    async fn list_threads(&self) -> RepoResult<Vec<Thread>>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn add_comment(&self, new: NewComment, thread_id: &str, owner_id: &str) -> RepoResult<Comment>;
    /// Comments of a thread in insertion order.
    async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<Comment>>;
    async fn get_comment_by_id(&self, id: &str) -> RepoResult<Option<Comment>>;
    async fn soft_delete_comment(&self, comment_id: &str, owner_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentReplyRepo: Send + Sync {
    async fn add_reply(
        &self,
        new: NewCommentReply,
        thread_id: &str,
        comment_id: &str,
        owner_id: &str,
    ) -> RepoResult<CommentReply>;
    /// Replies to a comment in insertion order.
    async fn get_replies_by_comment_id(&self, comment_id: &str) -> RepoResult<Vec<CommentReply>>;
    async fn get_reply_by_id(&self, id: &str) -> RepoResult<Option<CommentReply>>;
    async fn soft_delete_reply(&self, reply_id: &str, owner_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentLikeRepo: Send + Sync {
    /// Likes when not yet liked, unlikes otherwise. Returns the new state.
    async fn toggle_like(&self, comment_id: &str, user_id: &str) -> RepoResult<bool>;
    /// Comment id -> like count; comments without likes are absent.
    async fn get_comment_like_counts(&self, thread_id: &str) -> RepoResult<HashMap<Id, i64>>;
}

pub trait Repo: UserRepo + ThreadRepo + CommentRepo + CommentReplyRepo + CommentLikeRepo {}

impl<T> Repo for T where T: UserRepo + ThreadRepo + CommentRepo + CommentReplyRepo + CommentLikeRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct CommentLike {
        comment_id: Id,
        user_id: Id,
    }

    // Vectors, not maps: lookups must come back in insertion order.
    #[derive(Default, Serialize, Deserialize)]
    struct State {
        #[serde(default)] users: Vec<User>,
        #[serde(default)] threads: Vec<Thread>,
        #[serde(default)] comments: Vec<Comment>,
        #[serde(default)] replies: Vec<CommentReply>,
        #[serde(default)] likes: Vec<CommentLike>,
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        /// Volatile store, nothing touches disk.
        pub fn new() -> Self {
            Self::default()
        }

        /// Store backed by a JSON snapshot: loaded now, rewritten after every mutation.
        pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let state = Self::load_state_from(&path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
            }
        }

        /// Volatile store pre-populated from a seed file with the snapshot layout.
        pub fn from_seed_file(path: &Path) -> RepoResult<Self> {
            let bytes = std::fs::read(path)
                .map_err(|e| RepoError::Internal(format!("read seed '{}': {e}", path.display())))?;
            let state: State = serde_json::from_slice(&bytes)
                .map_err(|e| RepoError::Internal(format!("parse seed '{}': {e}", path.display())))?;
            info!(
                seed = %path.display(),
                threads = state.threads.len(),
                comments = state.comments.len(),
                "loaded seed data"
            );
            Ok(Self { state: Arc::new(RwLock::new(state)), snapshot_path: None })
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!(snapshot = %path.display(), "loaded snapshot");
                        s
                    }
                    Err(e) => {
                        warn!(snapshot = %path.display(), error = %e, "unparseable snapshot, starting empty");
                        State::default()
                    }
                },
                Err(e) => {
                    info!(snapshot = %path.display(), error = %e, "no snapshot, starting empty");
                    State::default()
                }
            }
        }

        // Call with no guard held. On error the in-memory change stays applied
        // but the caller sees the failure.
        fn persist(&self) -> RepoResult<()> {
            let Some(path) = self.snapshot_path.as_deref() else { return Ok(()) };
            let bytes = {
                let s = self.read()?;
                serde_json::to_vec_pretty(&*s).map_err(|e| RepoError::Internal(format!("serialize snapshot: {e}")))?
            };
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            std::fs::write(path, bytes).map_err(|e| {
                warn!(snapshot = %path.display(), error = %e, "failed to write snapshot");
                RepoError::Internal(format!("write snapshot '{}': {e}", path.display()))
            })
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn add_user(&self, new: NewUser) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.iter().any(|u| u.username == new.username) {
                return Err(RepoError::Conflict);
            }
            let user = User { id: new_id("user"), username: new.username, fullname: new.fullname };
            s.users.push(user.clone());
            drop(s);
            self.persist()?;
            Ok(user)
        }
        async fn get_user_by_id(&self, id: &str) -> RepoResult<Option<User>> {
            let s = self.read()?;
            Ok(s.users.iter().find(|u| u.id == id).cloned())
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn add_thread(&self, new: NewThread, owner_id: &str) -> RepoResult<Thread> {
            let mut s = self.write()?;
            let thread = Thread {
                id: new_id("thread"),
                title: new.title,
                body: new.body,
                created_at: Utc::now(),
                user_id: owner_id.to_string(),
            };
            s.threads.push(thread.clone());
            drop(s);
            self.persist()?;
            Ok(thread)
        }
        async fn get_thread_by_id(&self, id: &str) -> RepoResult<Option<Thread>> {
            let s = self.read()?;
            Ok(s.threads.iter().find(|t| t.id == id).cloned())
        }
        async fn list_threads(&self) -> RepoResult<Vec<Thread>> {
            Ok(self.read()?.threads.clone())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn add_comment(&self, new: NewComment, thread_id: &str, owner_id: &str) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.threads.iter().any(|t| t.id == thread_id) {
                return Err(RepoError::NotFound);
            }
            let comment = Comment {
                id: new_id("comment"),
                content: new.content,
                created_at: Utc::now(),
                user_id: owner_id.to_string(),
                thread_id: thread_id.to_string(),
                is_deleted: false,
            };
            s.comments.push(comment.clone());
            drop(s);
            self.persist()?;
            Ok(comment)
        }
        async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<Comment>> {
            let s = self.read()?;
            Ok(s.comments.iter().filter(|c| c.thread_id == thread_id).cloned().collect())
        }
        async fn get_comment_by_id(&self, id: &str) -> RepoResult<Option<Comment>> {
            let s = self.read()?;
            Ok(s.comments.iter().find(|c| c.id == id).cloned())
        }
        async fn soft_delete_comment(&self, comment_id: &str, owner_id: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let comment = s.comments.iter_mut().find(|c| c.id == comment_id).ok_or(RepoError::NotFound)?;
            if comment.user_id != owner_id {
                return Err(RepoError::Forbidden);
            }
            comment.is_deleted = true;
            drop(s);
            self.persist()?;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentReplyRepo for InMemRepo {
        async fn add_reply(
            &self,
            new: NewCommentReply,
            thread_id: &str,
            comment_id: &str,
            owner_id: &str,
        ) -> RepoResult<CommentReply> {
            let mut s = self.write()?;
            if !s.comments.iter().any(|c| c.id == comment_id && c.thread_id == thread_id) {
                return Err(RepoError::NotFound);
            }
            let reply = CommentReply {
                id: new_id("reply"),
                content: new.content,
                created_at: Utc::now(),
                user_id: owner_id.to_string(),
                comment_id: comment_id.to_string(),
                is_deleted: false,
            };
            s.replies.push(reply.clone());
            drop(s);
            self.persist()?;
            Ok(reply)
        }
        async fn get_replies_by_comment_id(&self, comment_id: &str) -> RepoResult<Vec<CommentReply>> {
            let s = self.read()?;
            Ok(s.replies.iter().filter(|r| r.comment_id == comment_id).cloned().collect())
        }
        async fn get_reply_by_id(&self, id: &str) -> RepoResult<Option<CommentReply>> {
            let s = self.read()?;
            Ok(s.replies.iter().find(|r| r.id == id).cloned())
        }
        async fn soft_delete_reply(&self, reply_id: &str, owner_id: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let reply = s.replies.iter_mut().find(|r| r.id == reply_id).ok_or(RepoError::NotFound)?;
            if reply.user_id != owner_id {
                return Err(RepoError::Forbidden);
            }
            reply.is_deleted = true;
            drop(s);
            self.persist()?;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentLikeRepo for InMemRepo {
        async fn toggle_like(&self, comment_id: &str, user_id: &str) -> RepoResult<bool> {
            let mut s = self.write()?;
            if !s.comments.iter().any(|c| c.id == comment_id) {
                return Err(RepoError::NotFound);
            }
            let existing = s.likes.iter().position(|l| l.comment_id == comment_id && l.user_id == user_id);
            let liked = match existing {
                Some(idx) => {
                    s.likes.remove(idx);
                    false
                }
                None => {
                    s.likes.push(CommentLike { comment_id: comment_id.to_string(), user_id: user_id.to_string() });
                    true
                }
            };
            drop(s);
            self.persist()?;
            Ok(liked)
        }
        async fn get_comment_like_counts(&self, thread_id: &str) -> RepoResult<HashMap<Id, i64>> {
            let s = self.read()?;
            let mut counts: HashMap<Id, i64> = HashMap::new();
            for like in &s.likes {
                let in_thread = s.comments.iter().any(|c| c.id == like.comment_id && c.thread_id == thread_id);
                if in_thread {
                    *counts.entry(like.comment_id.clone()).or_default() += 1;
                }
            }
            Ok(counts)
        }
    }

}

// Postgres implementation (feature = "postgres-store"); schema is managed outside this crate.
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::Utc;
    use sqlx::{Pool, Postgres};

    fn map_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
            _ => RepoError::Internal(e.to_string()),
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        async fn owner_of(&self, table: &'static str, id: &str) -> RepoResult<Option<Id>> {
            // `table` is one of two literals below, never user input
            let sql = format!("SELECT user_id FROM {table} WHERE id = $1");
            sqlx::query_scalar::<_, String>(&sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(map_err)
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn add_user(&self, new: NewUser) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "INSERT INTO users (id, username, fullname) VALUES ($1,$2,$3) RETURNING id, username, fullname"
            )
            .bind(new_id("user")).bind(&new.username).bind(new.fullname.as_ref())
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_user_by_id(&self, id: &str) -> RepoResult<Option<User>> {
            sqlx::query_as::<_, User>("SELECT id, username, fullname FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(map_err)
        }
    }

    #[async_trait]
    impl ThreadRepo for PgRepo {
        async fn add_thread(&self, new: NewThread, owner_id: &str) -> RepoResult<Thread> {
            sqlx::query_as::<_, Thread>(
                "INSERT INTO threads (id, title, body, created_at, user_id) VALUES ($1,$2,$3,$4,$5) \
                 RETURNING id, title, body, created_at, user_id"
            )
            .bind(new_id("thread")).bind(&new.title).bind(&new.body).bind(Utc::now()).bind(owner_id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_thread_by_id(&self, id: &str) -> RepoResult<Option<Thread>> {
            sqlx::query_as::<_, Thread>("SELECT id, title, body, created_at, user_id FROM threads WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(map_err)
        }
        async fn list_threads(&self) -> RepoResult<Vec<Thread>> {
            sqlx::query_as::<_, Thread>("SELECT id, title, body, created_at, user_id FROM threads ORDER BY created_at ASC")
                .fetch_all(&self.pool).await.map_err(map_err)
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn add_comment(&self, new: NewComment, thread_id: &str, owner_id: &str) -> RepoResult<Comment> {
            if self.get_thread_by_id(thread_id).await?.is_none() {
                return Err(RepoError::NotFound);
            }
            sqlx::query_as::<_, Comment>(
                "INSERT INTO comments (id, content, created_at, user_id, thread_id, is_delete) VALUES ($1,$2,$3,$4,$5,FALSE) \
                 RETURNING id, content, created_at, user_id, thread_id, is_delete AS is_deleted"
            )
            .bind(new_id("comment")).bind(&new.content).bind(Utc::now()).bind(owner_id).bind(thread_id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(
                "SELECT id, content, created_at, user_id, thread_id, is_delete AS is_deleted \
                 FROM comments WHERE thread_id = $1 ORDER BY created_at ASC"
            )
            .bind(thread_id)
            .fetch_all(&self.pool).await.map_err(map_err)
        }
        async fn get_comment_by_id(&self, id: &str) -> RepoResult<Option<Comment>> {
            sqlx::query_as::<_, Comment>(
                "SELECT id, content, created_at, user_id, thread_id, is_delete AS is_deleted FROM comments WHERE id = $1"
            )
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(map_err)
        }
        async fn soft_delete_comment(&self, comment_id: &str, owner_id: &str) -> RepoResult<()> {
            match self.owner_of("comments", comment_id).await? {
                None => return Err(RepoError::NotFound),
                Some(owner) if owner != owner_id => return Err(RepoError::Forbidden),
                Some(_) => {}
            }
            sqlx::query("UPDATE comments SET is_delete = TRUE WHERE id = $1")
                .bind(comment_id)
                .execute(&self.pool).await.map_err(map_err)?;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentReplyRepo for PgRepo {
        async fn add_reply(
            &self,
            new: NewCommentReply,
            thread_id: &str,
            comment_id: &str,
            owner_id: &str,
        ) -> RepoResult<CommentReply> {
            let parent = sqlx::query_scalar::<_, i32>("SELECT 1 FROM comments WHERE id = $1 AND thread_id = $2")
                .bind(comment_id).bind(thread_id)
                .fetch_optional(&self.pool).await.map_err(map_err)?;
            if parent.is_none() {
                return Err(RepoError::NotFound);
            }
            sqlx::query_as::<_, CommentReply>(
                "INSERT INTO comment_replies (id, content, created_at, user_id, thread_id, comment_id, is_delete) \
                 VALUES ($1,$2,$3,$4,$5,$6,FALSE) \
                 RETURNING id, content, created_at, user_id, comment_id, is_delete AS is_deleted"
            )
            .bind(new_id("reply")).bind(&new.content).bind(Utc::now()).bind(owner_id).bind(thread_id).bind(comment_id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_replies_by_comment_id(&self, comment_id: &str) -> RepoResult<Vec<CommentReply>> {
            sqlx::query_as::<_, CommentReply>(
                "SELECT id, content, created_at, user_id, comment_id, is_delete AS is_deleted \
                 FROM comment_replies WHERE comment_id = $1 ORDER BY created_at ASC"
            )
            .bind(comment_id)
            .fetch_all(&self.pool).await.map_err(map_err)
        }
        async fn get_reply_by_id(&self, id: &str) -> RepoResult<Option<CommentReply>> {
            sqlx::query_as::<_, CommentReply>(
                "SELECT id, content, created_at, user_id, comment_id, is_delete AS is_deleted FROM comment_replies WHERE id = $1"
            )
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(map_err)
        }
        async fn soft_delete_reply(&self, reply_id: &str, owner_id: &str) -> RepoResult<()> {
            match self.owner_of("comment_replies", reply_id).await? {
                None => return Err(RepoError::NotFound),
                Some(owner) if owner != owner_id => return Err(RepoError::Forbidden),
                Some(_) => {}
            }
            sqlx::query("UPDATE comment_replies SET is_delete = TRUE WHERE id = $1")
                .bind(reply_id)
                .execute(&self.pool).await.map_err(map_err)?;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentLikeRepo for PgRepo {
        async fn toggle_like(&self, comment_id: &str, user_id: &str) -> RepoResult<bool> {
            let mut tx = self.pool.begin().await.map_err(map_err)?;
            // Row lock serializes concurrent toggles on the same comment.
            let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx).await.map_err(map_err)?;
            if exists.is_none() {
                return Err(RepoError::NotFound);
            }
            let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
                .bind(comment_id).bind(user_id)
                .execute(&mut *tx).await.map_err(map_err)?
                .rows_affected();
            if removed == 0 {
                sqlx::query("INSERT INTO comment_likes (id, comment_id, user_id) VALUES ($1,$2,$3)")
                    .bind(new_id("like")).bind(comment_id).bind(user_id)
                    .execute(&mut *tx).await.map_err(map_err)?;
            }
            tx.commit().await.map_err(map_err)?;
            Ok(removed == 0)
        }
        async fn get_comment_like_counts(&self, thread_id: &str) -> RepoResult<HashMap<Id, i64>> {
            let rows = sqlx::query_as::<_, LikeCount>(r#"
                SELECT cl.comment_id, COUNT(*) AS count
                FROM comment_likes cl
                JOIN comments c ON c.id = cl.comment_id
                WHERE c.thread_id = $1
                GROUP BY cl.comment_id
            "#)
                .bind(thread_id)
                .fetch_all(&self.pool).await.map_err(map_err)?;
            Ok(rows.into_iter().map(|r| (r.comment_id, r.count)).collect())
        }
    }
}
