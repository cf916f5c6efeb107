
use murmur_db::EngagementStore;
use murmur_types::{NotificationKind, Page, TargetRef};
use rand::Rng;
use test_utils::spawn_context;
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_match_membership() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let target = TargetRef::post(post.id);

    let likers: Vec<Uuid> = (0..50).map(|_| Uuid::new_v4()).collect();
    let mut handles = Vec::new();
    for liker in likers.iter().copied() {
        let ctx = app.ctx.clone();
        handles.push(tokio::spawn(async move {
            ctx.engagement.toggle_like(liker, target).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().changed);
    }

    assert_eq!(app.post(post.id).await.like_count, 50);
    for liker in &likers {
        assert!(app.ctx.store.is_liked(*liker, target).await.unwrap());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_like_unlike_keeps_parity() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let target = TargetRef::post(post.id);
    let fan = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let ctx = app.ctx.clone();
        let like = rand::thread_rng().gen_bool(0.5);
        handles.push(tokio::spawn(async move {
            if like {
                ctx.engagement.like(fan, target).await.unwrap()
            } else {
                ctx.engagement.unlike(fan, target).await.unwrap()
            }
        }));
    }

    // Every applied transition moves the counter by exactly one
    let mut net = 0i64;
    for handle in handles {
        let state = handle.await.unwrap();
        if state.changed {
            net += if state.liked { 1 } else { -1 };
        }
        assert!(state.like_count == 0 || state.like_count == 1);
    }

    let liked = app.ctx.store.is_liked(fan, target).await.unwrap();
    assert_eq!(net, liked as i64);
    assert_eq!(app.post(post.id).await.like_count, liked as i64);
}

#[tokio::test]
async fn test_repeated_like_is_noop() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let target = TargetRef::post(post.id);
    let fan = Uuid::new_v4();

    assert!(app.ctx.engagement.like(fan, target).await.unwrap().changed);
    let again = app.ctx.engagement.like(fan, target).await.unwrap();
    assert!(!again.changed);
    assert_eq!(again.like_count, 1);

    let toggled = app.ctx.engagement.toggle_like(fan, target).await.unwrap();
    assert!(!toggled.liked);
    assert_eq!(toggled.like_count, 0);

    let unliked = app.ctx.engagement.unlike(fan, target).await.unwrap();
    assert!(!unliked.changed);
    assert_eq!(unliked.like_count, 0);

    let state = app.ctx.engagement.like_state(fan, target).await.unwrap();
    assert!(!state.liked);
    assert_eq!(state.like_count, 0);
}

#[tokio::test]
async fn test_like_missing_target_is_not_found() {
    let app = spawn_context();
    let err = app
        .ctx
        .engagement
        .like(Uuid::new_v4(), TargetRef::comment(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_like_notifies_author_once() {
    let app = spawn_context();
    let author = Uuid::new_v4();
    let fan = Uuid::new_v4();
    let post = app.seed_post(author).await;
    let target = TargetRef::post(post.id);

    app.ctx.engagement.like(fan, target).await.unwrap();
    app.ctx.engagement.like(fan, target).await.unwrap();
    app.settle().await;

    let notifications = app
        .ctx
        .notifications
        .list(author, Page::default())
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Like);
    assert_eq!(notifications[0].sender_id, fan);
    assert_eq!(notifications[0].reference_id, post.id);
}

#[tokio::test]
async fn test_add_comment_increments_count() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let commenter = Uuid::new_v4();

    let comment = app
        .ctx
        .engagement
        .add_comment(commenter, post.id, "  nice shot  ", None)
        .await
        .unwrap();

    assert_eq!(comment.content, "nice shot");
    assert_eq!(app.post(post.id).await.comment_count, 1);

    let listed = app
        .ctx
        .engagement
        .list_comments(post.id, None, Page::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, comment.id);
}

#[tokio::test]
async fn test_comment_validation() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let other_post = app.seed_post(Uuid::new_v4()).await;
    let user = Uuid::new_v4();

    let err = app
        .ctx
        .engagement
        .add_comment(user, post.id, "   ", None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let too_long = "x".repeat(murmur_config::MAX_COMMENT_LENGTH + 1);
    let err = app
        .ctx
        .engagement
        .add_comment(user, post.id, &too_long, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let err = app
        .ctx
        .engagement
        .add_comment(user, Uuid::new_v4(), "hello", None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");

    let elsewhere = app
        .ctx
        .engagement
        .add_comment(user, other_post.id, "first", None)
        .await
        .unwrap();
    let err = app
        .ctx
        .engagement
        .add_comment(user, post.id, "reply", Some(elsewhere.id))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    // Nothing was written by the rejected calls
    assert_eq!(app.post(post.id).await.comment_count, 0);
}

#[tokio::test]
async fn test_remove_comment_cascades_replies() {
    let app = spawn_context();
    let owner = Uuid::new_v4();
    let author = Uuid::new_v4();
    let post = app.seed_post(owner).await;

    let root = app
        .ctx
        .engagement
        .add_comment(author, post.id, "root", None)
        .await
        .unwrap();
    let mut replies = Vec::new();
    for i in 0..3 {
        let reply = app
            .ctx
            .engagement
            .add_comment(Uuid::new_v4(), post.id, &format!("reply {}", i), Some(root.id))
            .await
            .unwrap();
        replies.push(reply);
    }
    let keeper = app
        .ctx
        .engagement
        .add_comment(author, post.id, "unrelated", None)
        .await
        .unwrap();

    assert_eq!(app.post(post.id).await.comment_count, 5);
    assert_eq!(app.comment(root.id).await.unwrap().reply_count, 3);

    // A like on a reply disappears with it
    app.ctx
        .engagement
        .like(owner, TargetRef::comment(replies[0].id))
        .await
        .unwrap();

    let removal = app
        .ctx
        .engagement
        .remove_comment(author, root.id)
        .await
        .unwrap();

    assert_eq!(removal.removed_ids.len(), 4);
    assert_eq!(removal.comment_count, 1);
    assert_eq!(app.post(post.id).await.comment_count, 1);
    for reply in &replies {
        assert!(app.comment(reply.id).await.is_none());
    }
    assert!(!app
        .ctx
        .store
        .is_liked(owner, TargetRef::comment(replies[0].id))
        .await
        .unwrap());
    assert!(app.comment(keeper.id).await.is_some());
}

#[tokio::test]
async fn test_remove_reply_decrements_parent() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let author = Uuid::new_v4();

    let root = app
        .ctx
        .engagement
        .add_comment(author, post.id, "root", None)
        .await
        .unwrap();
    let reply = app
        .ctx
        .engagement
        .add_comment(author, post.id, "reply", Some(root.id))
        .await
        .unwrap();

    app.ctx
        .engagement
        .remove_comment(author, reply.id)
        .await
        .unwrap();

    assert_eq!(app.comment(root.id).await.unwrap().reply_count, 0);
    assert_eq!(app.post(post.id).await.comment_count, 1);
}

#[tokio::test]
async fn test_remove_comment_authorization() {
    let app = spawn_context();
    let owner = Uuid::new_v4();
    let author = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let post = app.seed_post(owner).await;

    let first = app
        .ctx
        .engagement
        .add_comment(author, post.id, "first", None)
        .await
        .unwrap();
    let second = app
        .ctx
        .engagement
        .add_comment(author, post.id, "second", None)
        .await
        .unwrap();

    let err = app
        .ctx
        .engagement
        .remove_comment(stranger, first.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
    assert_eq!(app.post(post.id).await.comment_count, 2);

    // The post owner may moderate
    app.ctx.engagement.remove_comment(owner, first.id).await.unwrap();
    app.ctx.engagement.remove_comment(author, second.id).await.unwrap();
    assert_eq!(app.post(post.id).await.comment_count, 0);

    let err = app
        .ctx
        .engagement
        .remove_comment(author, second.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_comment_count_never_negative() {
    let app = spawn_context();
    let owner = Uuid::new_v4();
    let post = app.seed_post(owner).await;

    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(
            app.ctx
                .engagement
                .add_comment(owner, post.id, &format!("c{}", i), None)
                .await
                .unwrap()
                .id,
        );
    }

    // Racing removals of the same comments must not double-decrement
    let mut handles = Vec::new();
    for _ in 0..3 {
        for id in ids.iter().copied() {
            let ctx = app.ctx.clone();
            handles.push(tokio::spawn(async move {
                let _ = ctx.engagement.remove_comment(owner, id).await;
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(app.post(post.id).await.comment_count, 0);
}

#[tokio::test]
async fn test_reply_notifies_parent_and_post_authors() {
    let app = spawn_context();
    let owner = Uuid::new_v4();
    let commenter = Uuid::new_v4();
    let replier = Uuid::new_v4();
    let post = app.seed_post(owner).await;

    let root = app
        .ctx
        .engagement
        .add_comment(commenter, post.id, "root", None)
        .await
        .unwrap();
    app.ctx
        .engagement
        .add_comment(replier, post.id, "reply", Some(root.id))
        .await
        .unwrap();
    app.settle().await;

    let to_commenter = app
        .ctx
        .notifications
        .list(commenter, Page::default())
        .await
        .unwrap();
    assert_eq!(to_commenter.len(), 1);
    assert_eq!(to_commenter[0].kind, NotificationKind::Reply);
    assert_eq!(to_commenter[0].reference_id, post.id);

    let to_owner = app
        .ctx
        .notifications
        .list(owner, Page::default())
        .await
        .unwrap();
    assert_eq!(to_owner.len(), 2);
    assert!(to_owner.iter().all(|n| n.kind == NotificationKind::Comment));
}

#[tokio::test]
async fn test_like_event_reaches_room() {
    let app = spawn_context();
    let post = app.seed_post(Uuid::new_v4()).await;
    let viewer = Uuid::new_v4();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let session = Uuid::new_v4();
    app.ctx.registry.register(session, viewer, tx).await.unwrap();
    app.ctx
        .registry
        .subscribe(session, murmur_types::Topic::room(post.id))
        .await
        .unwrap();

    app.ctx
        .engagement
        .like(Uuid::new_v4(), TargetRef::post(post.id))
        .await
        .unwrap();
    app.settle().await;

    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope.event_type, "post:liked");
    assert_eq!(envelope.counters.and_then(|c| c.like_count), Some(1));
}

#[tokio::test]
async fn test_unlike_reaches_author_inbox() {
    let app = spawn_context();
    let author = Uuid::new_v4();
    let fan = Uuid::new_v4();
    let post = app.seed_post(author).await;
    let target = TargetRef::post(post.id);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    app.ctx
        .registry
        .register(Uuid::new_v4(), author, tx)
        .await
        .unwrap();

    app.ctx.engagement.like(fan, target).await.unwrap();
    app.settle().await;
    assert_eq!(rx.recv().await.unwrap().event_type, "notification:new");

    app.ctx.engagement.unlike(fan, target).await.unwrap();
    app.settle().await;
    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope.event_type, "post:unliked");
    assert_eq!(envelope.topic, murmur_types::Topic::inbox(author));
    assert_eq!(envelope.actor_id, fan);
    assert!(rx.try_recv().is_err());

    // The author undoing their own like sends nothing to their inbox
    app.ctx.engagement.like(author, target).await.unwrap();
    app.ctx.engagement.unlike(author, target).await.unwrap();
    app.settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_moderated_comment_author_is_told() {
    let app = spawn_context();
    let owner = Uuid::new_v4();
    let commenter = Uuid::new_v4();
    let post = app.seed_post(owner).await;

    let comment = app
        .ctx
        .engagement
        .add_comment(commenter, post.id, "off topic", None)
        .await
        .unwrap();
    app.settle().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    app.ctx
        .registry
        .register(Uuid::new_v4(), commenter, tx)
        .await
        .unwrap();

    app.ctx
        .engagement
        .remove_comment(owner, comment.id)
        .await
        .unwrap();
    app.settle().await;

    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope.event_type, "comment:deleted");
    assert_eq!(envelope.topic, murmur_types::Topic::inbox(commenter));
    assert_eq!(envelope.reference_id, comment.id);
}
