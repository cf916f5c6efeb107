
use murmur_types::{NotificationKind, Page};
use test_utils::spawn_context;
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::test]
async fn test_follow_is_idempotent() {
    let app = spawn_context();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(app.ctx.follows.follow(alice, bob).await.unwrap());
    assert!(!app.ctx.follows.follow(alice, bob).await.unwrap());
    app.settle().await;

    assert!(app.ctx.follows.is_following(alice, bob).await.unwrap());
    assert!(!app.ctx.follows.is_following(bob, alice).await.unwrap());
    assert_eq!(app.ctx.follows.followers(bob).await.unwrap(), vec![alice]);
    assert_eq!(app.ctx.follows.following(alice).await.unwrap(), vec![bob]);

    let notifications = app
        .ctx
        .notifications
        .list(bob, Page::default())
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Follow);
    assert_eq!(notifications[0].reference_id, alice);
}

#[tokio::test]
async fn test_unfollow() {
    let app = spawn_context();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(!app.ctx.follows.unfollow(alice, bob).await.unwrap());
    app.ctx.follows.follow(alice, bob).await.unwrap();
    assert!(app.ctx.follows.unfollow(alice, bob).await.unwrap());
    assert!(app.ctx.follows.followers(bob).await.unwrap().is_empty());

    let err = app.ctx.follows.unfollow(alice, alice).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_follow_events_go_to_followee() {
    let app = spawn_context();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.ctx
        .registry
        .register(Uuid::new_v4(), bob, tx)
        .await
        .unwrap();

    app.ctx.follows.follow(alice, bob).await.unwrap();
    app.settle().await;
    app.ctx.follows.unfollow(alice, bob).await.unwrap();
    app.settle().await;

    let names: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| e.event_type.clone())
        .collect();
    assert_eq!(
        names,
        vec!["user:followed", "notification:new", "user:unfollowed"]
    );
}
