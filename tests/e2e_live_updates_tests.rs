//! End-to-end tests for live delivery of created notifications

mod common;

use std::time::Duration;

use common::{info, TestContext, ADMIN_1, USER_1, USER_2};
use notification_center::live::{msg_types, HubState, LiveUpdateHub, ServerMessage};
use notification_center::notifications::{NotificationQuery, Owner};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn next_message(subscription: &mut notification_center::live::Subscription) -> ServerMessage {
    tokio::time::timeout(RECV_TIMEOUT, subscription.recv())
        .await
        .expect("Timed out waiting for live message")
        .expect("Subscription closed")
}

#[tokio::test]
async fn test_created_notification_is_pushed_to_owner() {
    let ctx = TestContext::new();
    let mut subscription = ctx.hub.register(Owner::user(USER_1));

    let created = ctx.service.users().send(USER_1, info("live")).unwrap();

    let message = next_message(&mut subscription).await;
    assert_eq!(message.msg_type, msg_types::NOTIFICATION_CREATED);
    assert_eq!(message.notification().unwrap(), created);
}

#[tokio::test]
async fn test_every_session_of_the_owner_receives_it() {
    let ctx = TestContext::new();
    let mut phone = ctx.hub.register(Owner::admin(ADMIN_1));
    let mut laptop = ctx.hub.register(Owner::admin(ADMIN_1));

    let created = ctx.service.admins().send(ADMIN_1, info("both")).unwrap();

    assert_eq!(next_message(&mut phone).await.notification().unwrap().id, created.id);
    assert_eq!(next_message(&mut laptop).await.notification().unwrap().id, created.id);
}

#[tokio::test]
async fn test_other_owners_receive_nothing() {
    let ctx = TestContext::new();
    let mut other_user = ctx.hub.register(Owner::user(USER_2));
    let mut same_id_admin = ctx.hub.register(Owner::admin(USER_1));
    let mut target = ctx.hub.register(Owner::user(USER_1));

    ctx.service.users().send(USER_1, info("targeted")).unwrap();
    next_message(&mut target).await;

    // Publish is processed in order, so the count reply means fan-out is done
    assert_eq!(ctx.hub.subscriber_count().await, 3);
    assert!(other_user.try_recv().is_err());
    assert!(same_id_admin.try_recv().is_err());
}

#[tokio::test]
async fn test_delivery_order_matches_creation_order() {
    let ctx = TestContext::new();
    let mut subscription = ctx.hub.register(Owner::user(USER_1));

    let created: Vec<String> = (0..6)
        .map(|i| ctx.service.users().send(USER_1, info(&format!("n{}", i))).unwrap().id)
        .collect();

    let mut delivered = Vec::new();
    for _ in 0..created.len() {
        delivered.push(next_message(&mut subscription).await.notification().unwrap().id);
    }
    assert_eq!(delivered, created);
}

#[tokio::test]
async fn test_send_without_subscribers_succeeds() {
    let ctx = TestContext::new();
    assert_eq!(ctx.hub.subscriber_count().await, 0);
    ctx.service.users().send(USER_1, info("nobody listens")).unwrap();
    assert_eq!(ctx.service.users().unread_count(USER_1).unwrap(), 1);
}

#[tokio::test]
async fn test_stalled_subscriber_does_not_block_sends() {
    let ctx = TestContext::new();
    let _stalled = ctx.hub.register(Owner::user(USER_1));

    // Far more than the subscriber buffer, nobody reads
    for i in 0..50 {
        ctx.service
            .users()
            .send(USER_1, info(&format!("n{}", i)))
            .unwrap();
    }
    assert_eq!(
        ctx.service
            .users()
            .list(USER_1, NotificationQuery::default())
            .unwrap()
            .len(),
        50
    );

    let mut fresh = ctx.hub.register(Owner::user(USER_1));
    let created = ctx.service.users().send(USER_1, info("after the flood")).unwrap();
    assert_eq!(next_message(&mut fresh).await.notification().unwrap().id, created.id);
}

#[tokio::test]
async fn test_stop_closes_sessions_and_sends_still_succeed() {
    let ctx = TestContext::new();
    let mut subscription = ctx.hub.register(Owner::user(USER_1));

    ctx.hub.stop();
    assert_eq!(ctx.hub.state(), HubState::Stopped);
    let closed = tokio::time::timeout(RECV_TIMEOUT, subscription.recv())
        .await
        .unwrap();
    assert!(closed.is_none());

    ctx.service.users().send(USER_1, info("after stop")).unwrap();
    assert_eq!(ctx.service.users().unread_count(USER_1).unwrap(), 1);

    let mut late = ctx.hub.register(Owner::user(USER_1));
    assert!(late.recv().await.is_none());
}

#[tokio::test]
async fn test_hub_can_be_shared_by_independent_services() {
    let hub = std::sync::Arc::new(LiveUpdateHub::new(4));
    hub.start().unwrap();
    let mut subscription = hub.register(Owner::user(USER_1));

    let store = std::sync::Arc::new(
        notification_center::notifications::SqliteNotificationStore::in_memory().unwrap(),
    );
    let service = notification_center::notifications::NotificationService::new(
        store.clone(),
        store,
        hub.clone(),
    );
    service.users().send(USER_1, info("shared hub")).unwrap();

    assert_eq!(
        next_message(&mut subscription).await.notification().unwrap().title,
        "shared hub"
    );
    hub.stop();
}
