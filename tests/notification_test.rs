
use murmur_types::{NotificationKind, Page, TargetRef};
use rand::Rng;
use test_utils::spawn_context;
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::test]
async fn test_self_actions_never_notify() {
    let app = spawn_context();
    let me = Uuid::new_v4();
    let post = app.seed_post(me).await;
    let root = app
        .ctx
        .engagement
        .add_comment(me, post.id, "my own comment", None)
        .await
        .unwrap();

    for _ in 0..40 {
        let action = rand::thread_rng().gen_range(0..5);
        match action {
            0 => {
                app.ctx
                    .engagement
                    .toggle_like(me, TargetRef::post(post.id))
                    .await
                    .unwrap();
            }
            1 => {
                app.ctx
                    .engagement
                    .toggle_like(me, TargetRef::comment(root.id))
                    .await
                    .unwrap();
            }
            2 => {
                app.ctx
                    .engagement
                    .add_comment(me, post.id, "talking to myself", None)
                    .await
                    .unwrap();
            }
            3 => {
                app.ctx
                    .engagement
                    .add_comment(me, post.id, "replying to myself", Some(root.id))
                    .await
                    .unwrap();
            }
            _ => {
                assert!(app.ctx.follows.follow(me, me).await.is_err());
            }
        }
    }
    app.settle().await;

    assert!(app
        .ctx
        .notifications
        .list(me, Page::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(app.ctx.notifications.unread_count(me).await.unwrap(), 0);
}

#[tokio::test]
async fn test_notifications_are_scoped_to_receiver() {
    let app = spawn_context();
    let (author, fan, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let post = app.seed_post(author).await;

    app.ctx
        .engagement
        .like(fan, TargetRef::post(post.id))
        .await
        .unwrap();
    app.settle().await;

    let mine = app
        .ctx
        .notifications
        .list(author, Page::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    let id = mine[0].id;

    // Another principal can neither read nor delete it
    let err = app.ctx.notifications.mark_read(id, other).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    let err = app.ctx.notifications.delete(id, other).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    assert!(app
        .ctx
        .notifications
        .list(other, Page::default())
        .await
        .unwrap()
        .is_empty());

    let read = app.ctx.notifications.mark_read(id, author).await.unwrap();
    assert!(read.is_read);
    assert_eq!(app.ctx.notifications.unread_count(author).await.unwrap(), 0);

    app.ctx.notifications.delete(id, author).await.unwrap();
    assert!(app
        .ctx
        .notifications
        .list(author, Page::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_mark_all_read() {
    let app = spawn_context();
    let author = Uuid::new_v4();
    let post = app.seed_post(author).await;

    for _ in 0..3 {
        app.ctx
            .engagement
            .like(Uuid::new_v4(), TargetRef::post(post.id))
            .await
            .unwrap();
    }
    app.settle().await;
    assert_eq!(app.ctx.notifications.unread_count(author).await.unwrap(), 3);

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.ctx
        .registry
        .register(Uuid::new_v4(), author, tx)
        .await
        .unwrap();

    assert_eq!(app.ctx.notifications.mark_all_read(author).await.unwrap(), 3);
    assert_eq!(app.ctx.notifications.mark_all_read(author).await.unwrap(), 0);
    app.settle().await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, "notification:read");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_new_notification_pushed_to_inbox() {
    let app = spawn_context();
    let (author, fan) = (Uuid::new_v4(), Uuid::new_v4());
    let post = app.seed_post(author).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.ctx
        .registry
        .register(Uuid::new_v4(), author, tx)
        .await
        .unwrap();

    app.ctx
        .engagement
        .add_comment(fan, post.id, "great post", None)
        .await
        .unwrap();
    app.settle().await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, "notification:new");
    assert_eq!(event.actor_id, fan);

    let stored = app
        .ctx
        .notifications
        .list(author, Page::default())
        .await
        .unwrap();
    assert_eq!(stored[0].kind, NotificationKind::Comment);
    assert_eq!(stored[0].reference_id, post.id);
}
