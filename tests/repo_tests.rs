#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use forum_details::{
    models::{NewComment, NewCommentReply, NewThread, NewUser},
    repo::{inmem::InMemRepo, RepoError},
    ThreadDetailsAssembler, COMMENT_DELETED_CONTENT, REPLY_DELETED_CONTENT,
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use forum_details::repo::{CommentLikeRepo, CommentReplyRepo, CommentRepo, ThreadRepo, UserRepo};

fn new_user(name: &str) -> NewUser {
    NewUser { username: name.into(), fullname: Some(format!("{name} full")) }
}

fn new_thread() -> NewThread {
    NewThread { title: "First Thread".into(), body: "This is first thread".into() }
}

#[tokio::test]
async fn user_registration_and_conflict() {
    let r = InMemRepo::new();

    let u = r.add_user(new_user("dicoding")).await.unwrap();
    assert!(u.id.starts_with("user-"));
    assert_eq!(r.get_user_by_id(&u.id).await.unwrap(), Some(u.clone()));

    // duplicate username → conflict
    let err = r.add_user(new_user("dicoding")).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));

    assert!(r.get_user_by_id("user-missing").await.unwrap().is_none());
}

#[tokio::test]
async fn thread_comment_reply_flow_keeps_insertion_order() {
    let r = InMemRepo::new();
    let u = r.add_user(new_user("dicoding")).await.unwrap();

    let thread = r.add_thread(new_thread(), &u.id).await.unwrap();
    assert_eq!(r.get_thread_by_id(&thread.id).await.unwrap(), Some(thread.clone()));
    assert_eq!(r.list_threads().await.unwrap().len(), 1);

    let mut ids = Vec::new();
    for n in 0..3 {
        let c = r.add_comment(NewComment { content: format!("comment {n}") }, &thread.id, &u.id).await.unwrap();
        ids.push(c.id);
    }
    let listed: Vec<_> = r.get_comments_by_thread_id(&thread.id).await.unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(listed, ids);

    let reply = r
        .add_reply(NewCommentReply { content: "This is a reply".into() }, &thread.id, &ids[0], &u.id)
        .await
        .unwrap();
    let replies = r.get_replies_by_comment_id(&ids[0]).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, reply.id);
    assert!(r.get_replies_by_comment_id(&ids[1]).await.unwrap().is_empty());
}

#[tokio::test]
async fn writes_against_missing_parents_are_not_found() {
    let r = InMemRepo::new();
    let u = r.add_user(new_user("dicoding")).await.unwrap();

    let err = r.add_comment(NewComment { content: "x".into() }, "thread-nope", &u.id).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));

    // comment exists, but under another thread
    let t1 = r.add_thread(new_thread(), &u.id).await.unwrap();
    let t2 = r.add_thread(new_thread(), &u.id).await.unwrap();
    let c = r.add_comment(NewComment { content: "x".into() }, &t1.id, &u.id).await.unwrap();
    let err = r
        .add_reply(NewCommentReply { content: "y".into() }, &t2.id, &c.id, &u.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));

    assert!(matches!(r.toggle_like("comment-nope", &u.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn soft_delete_checks_owner_and_keeps_content() {
    let r = InMemRepo::new();
    let owner = r.add_user(new_user("owner")).await.unwrap();
    let other = r.add_user(new_user("other")).await.unwrap();
    let t = r.add_thread(new_thread(), &owner.id).await.unwrap();
    let c = r.add_comment(NewComment { content: "original".into() }, &t.id, &owner.id).await.unwrap();
    let rep = r.add_reply(NewCommentReply { content: "reply text".into() }, &t.id, &c.id, &owner.id).await.unwrap();

    assert!(matches!(r.soft_delete_comment(&c.id, &other.id).await, Err(RepoError::Forbidden)));
    assert!(matches!(r.soft_delete_comment("comment-nope", &owner.id).await, Err(RepoError::NotFound)));
    r.soft_delete_comment(&c.id, &owner.id).await.unwrap();

    assert!(matches!(r.soft_delete_reply(&rep.id, &other.id).await, Err(RepoError::Forbidden)));
    r.soft_delete_reply(&rep.id, &owner.id).await.unwrap();

    let stored = &r.get_comments_by_thread_id(&t.id).await.unwrap()[0];
    assert!(stored.is_deleted);
    assert_eq!(stored.content, "original");
    let stored = &r.get_replies_by_comment_id(&c.id).await.unwrap()[0];
    assert!(stored.is_deleted);
    assert_eq!(stored.content, "reply text");
}

#[tokio::test]
async fn like_toggles_per_user() {
    let r = InMemRepo::new();
    let u1 = r.add_user(new_user("a")).await.unwrap();
    let u2 = r.add_user(new_user("b")).await.unwrap();
    let t = r.add_thread(new_thread(), &u1.id).await.unwrap();
    let c = r.add_comment(NewComment { content: "x".into() }, &t.id, &u1.id).await.unwrap();

    assert!(r.toggle_like(&c.id, &u1.id).await.unwrap());
    assert!(r.toggle_like(&c.id, &u2.id).await.unwrap());
    assert_eq!(r.get_comment_like_counts(&t.id).await.unwrap()[&c.id], 2);

    // second toggle by the same user unlikes
    assert!(!r.toggle_like(&c.id, &u1.id).await.unwrap());
    assert_eq!(r.get_comment_like_counts(&t.id).await.unwrap()[&c.id], 1);
}

#[tokio::test]
async fn snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let r = InMemRepo::with_snapshot(&path);
    let u = r.add_user(new_user("dicoding")).await.unwrap();
    let t = r.add_thread(new_thread(), &u.id).await.unwrap();
    let c = r.add_comment(NewComment { content: "persisted".into() }, &t.id, &u.id).await.unwrap();
    r.toggle_like(&c.id, &u.id).await.unwrap();
    drop(r);

    let reopened = InMemRepo::with_snapshot(&path);
    assert_eq!(reopened.get_thread_by_id(&t.id).await.unwrap(), Some(t.clone()));
    assert_eq!(reopened.get_comments_by_thread_id(&t.id).await.unwrap()[0].content, "persisted");
    assert_eq!(reopened.get_comment_like_counts(&t.id).await.unwrap()[&c.id], 1);
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let r = InMemRepo::with_snapshot(&path);
    assert!(r.list_threads().await.unwrap().is_empty());
}

#[tokio::test]
async fn seed_file_populates_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.json");
    let seed = serde_json::json!({
        "users": [{ "id": "user-1", "username": "dicoding", "fullname": null }],
        "threads": [{
            "id": "thread-1", "title": "t", "body": "b",
            "created_at": "2023-07-18T20:38:31Z", "user_id": "user-1"
        }],
        "comments": [{
            "id": "comment-1", "content": "c", "created_at": "2023-07-18T21:00:00Z",
            "user_id": "user-1", "thread_id": "thread-1", "is_deleted": false
        }]
    });
    std::fs::write(&path, serde_json::to_vec(&seed).unwrap()).unwrap();

    let r = InMemRepo::from_seed_file(&path).unwrap();
    assert_eq!(r.get_comments_by_thread_id("thread-1").await.unwrap().len(), 1);
    assert!(r.get_replies_by_comment_id("comment-1").await.unwrap().is_empty());

    let missing = InMemRepo::from_seed_file(&dir.path().join("nope.json"));
    assert!(matches!(missing, Err(RepoError::Internal(_))));
}

#[tokio::test]
async fn assembler_over_inmem_store_end_to_end() {
    let r = Arc::new(InMemRepo::new());
    let arnold = r.add_user(new_user("Arnold Szechuan")).await.unwrap();
    let dhh = r.add_user(new_user("DHH")).await.unwrap();
    let t = r.add_thread(new_thread(), &arnold.id).await.unwrap();
    let c1 = r.add_comment(NewComment { content: "first".into() }, &t.id, &arnold.id).await.unwrap();
    let c2 = r.add_comment(NewComment { content: "second".into() }, &t.id, &dhh.id).await.unwrap();
    let r1 = r.add_reply(NewCommentReply { content: "nope".into() }, &t.id, &c1.id, &dhh.id).await.unwrap();
    r.add_reply(NewCommentReply { content: "yes".into() }, &t.id, &c1.id, &arnold.id).await.unwrap();
    r.soft_delete_comment(&c1.id, &arnold.id).await.unwrap();
    r.soft_delete_reply(&r1.id, &dhh.id).await.unwrap();
    r.toggle_like(&c1.id, &dhh.id).await.unwrap();

    let details = ThreadDetailsAssembler::from_repo(r.clone()).assemble(&t.id).await.unwrap();

    assert_eq!(details.username, "Arnold Szechuan");
    assert_eq!(details.comments.len(), 2);
    let first = &details.comments[0];
    assert_eq!(first.content, COMMENT_DELETED_CONTENT);
    assert_eq!(first.like_count, 1);
    assert_eq!(first.replies.len(), 2);
    assert_eq!(first.replies[0].content, REPLY_DELETED_CONTENT);
    assert_eq!(first.replies[0].username, "DHH");
    assert_eq!(first.replies[1].content, "yes");
    let second = &details.comments[1];
    assert_eq!(second.id, c2.id);
    assert_eq!(second.content, "second");
    assert_eq!(second.like_count, 0);
    assert!(second.replies.is_empty());
}

#[tokio::test]
async fn single_comment_and_reply_lookups() {
    let r = InMemRepo::new();
    let u = r.add_user(new_user("dicoding")).await.unwrap();
    let t = r.add_thread(new_thread(), &u.id).await.unwrap();
    let c = r.add_comment(NewComment { content: "a comment".into() }, &t.id, &u.id).await.unwrap();
    let rep = r.add_reply(NewCommentReply { content: "a reply".into() }, &t.id, &c.id, &u.id).await.unwrap();

    assert_eq!(r.get_comment_by_id(&c.id).await.unwrap(), Some(c.clone()));
    assert_eq!(r.get_reply_by_id(&rep.id).await.unwrap(), Some(rep.clone()));

    // missing rows come back as None, not an error
    assert!(r.get_comment_by_id("comment-nope").await.unwrap().is_none());
    assert!(r.get_reply_by_id("reply-nope").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_snapshot_write_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // a plain file where the snapshot directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();

    let r = InMemRepo::with_snapshot(blocker.join("state.json"));
    let err = r.add_user(new_user("dicoding")).await.unwrap_err();
    assert!(matches!(err, RepoError::Internal(ref m) if m.starts_with("write snapshot")));
}
