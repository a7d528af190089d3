//! End-to-end tests: publish → fan-out → delivery → stream.
//!
//! ```bash
//! cargo test -p fanout-engine --test integration -- --nocapture
//! ```

use std::sync::Arc;
use std::time::Duration;

use fanout_common::store::Store;
use fanout_common::types::{DeliveryStatus, User};
use fanout_engine::notifications::NotificationService;
use fanout_engine::publisher::{PostPublisher, PublishRequest};
use fanout_notifier::{NotificationQueue, QueueConfig, ScriptedDelivery, SimulatedDelivery};

// ============================================================
// Shared helpers
// ============================================================

fn queue_config() -> QueueConfig {
    QueueConfig {
        worker_count: 3,
        max_retries: 2,
        capacity: 100,
        backoff_unit: Duration::from_millis(1),
    }
}

/// user1 is followed by user2 and user3; user2 and user3 have no followers.
fn seed_users(store: &Store) {
    store.add_user(User::new("user1", "user1"));
    store.add_user(User::new("user2", "user2"));
    store.add_user(User::new("user3", "user3"));
    store.follow("user2", "user1").unwrap();
    store.follow("user3", "user1").unwrap();
}

fn request(user_id: &str, content: &str) -> PublishRequest {
    PublishRequest {
        user_id: user_id.to_string(),
        content: content.to_string(),
    }
}

// ============================================================
// Publish → deliver → stream
// ============================================================

#[tokio::test]
async fn test_published_post_reaches_followers() {
    let store = Arc::new(Store::new());
    seed_users(&store);

    let mut queue = NotificationQueue::new(
        Arc::clone(&store),
        ScriptedDelivery::always_succeed(),
        queue_config(),
    );
    queue.start().unwrap();

    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());
    let notifications = NotificationService::new(Arc::clone(&store));

    let response = publisher
        .publish(&request("user1", "Test post content"))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.notifications_queued, 2);

    queue.stop().await;

    for follower in ["user2", "user3"] {
        let streamed = notifications.stream_notifications(follower);
        assert_eq!(streamed.len(), 1, "Expected one notification for {}", follower);
        let n = &streamed[0];
        assert_eq!(n.user_id, follower);
        assert_eq!(n.post_id, response.post_id);
        assert_eq!(n.post_author_id, "user1");
        assert_eq!(n.status, DeliveryStatus::Delivered);
        assert_eq!(n.content, "user1 posted: Test post content");
    }

    // The author is not their own follower
    assert!(notifications.stream_notifications("user1").is_empty());
}

#[tokio::test]
async fn test_three_followers_delivered_or_counted_failed() {
    let store = Arc::new(Store::new());
    store.add_user(User::new("author", "author"));
    for follower in ["follower1", "follower2", "follower3"] {
        store.follow(follower, "author").unwrap();
    }

    let mut queue = NotificationQueue::new(
        Arc::clone(&store),
        SimulatedDelivery::new(0.5, Duration::ZERO),
        queue_config(),
    );
    queue.start().unwrap();
    let metrics = queue.metrics();

    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());
    let response = publisher.publish(&request("author", "coin flip")).await.unwrap();
    assert_eq!(response.notifications_queued, 3);

    queue.stop().await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.terminal_outcomes(), 3);

    let delivered = ["follower1", "follower2", "follower3"]
        .iter()
        .filter(|f| !store.notifications_for(f).is_empty())
        .count() as u64;
    assert_eq!(delivered, snapshot.total_sent);
    assert_eq!(3 - delivered, snapshot.total_failed);
}

#[tokio::test]
async fn test_publish_without_followers_enqueues_nothing() {
    let store = Arc::new(Store::new());
    seed_users(&store);

    let mut queue = NotificationQueue::new(
        Arc::clone(&store),
        ScriptedDelivery::always_succeed(),
        queue_config(),
    );
    queue.start().unwrap();
    let metrics = queue.metrics();

    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());
    let response = publisher
        .publish(&request("user2", "Post with no notifications"))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.notifications_queued, 0);

    queue.stop().await;
    assert_eq!(metrics.snapshot().terminal_outcomes(), 0);
}

#[tokio::test]
async fn test_empty_content_still_fans_out() {
    let store = Arc::new(Store::new());
    seed_users(&store);

    let mut queue = NotificationQueue::new(
        Arc::clone(&store),
        ScriptedDelivery::always_succeed(),
        queue_config(),
    );
    queue.start().unwrap();

    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());
    let response = publisher.publish(&request("user1", "")).await.unwrap();
    assert_eq!(response.notifications_queued, 2);

    queue.stop().await;
    for follower in ["user2", "user3"] {
        assert_eq!(store.notifications_for(follower).len(), 1);
    }
}

#[tokio::test]
async fn test_exhausted_delivery_is_never_streamed() {
    let store = Arc::new(Store::new());
    seed_users(&store);

    let backend = ScriptedDelivery::always_succeed().script("user3", [false, false]);
    let mut queue = NotificationQueue::new(Arc::clone(&store), backend, queue_config());
    queue.start().unwrap();
    let metrics = queue.metrics();

    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());
    let notifications = NotificationService::new(Arc::clone(&store));
    publisher.publish(&request("user1", "hello")).await.unwrap();

    queue.stop().await;

    assert_eq!(notifications.stream_notifications("user2").len(), 1);
    assert!(notifications.stream_notifications("user3").is_empty());
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_sent, 1);
    assert_eq!(snapshot.total_failed, 1);
}

#[tokio::test]
async fn test_publish_response_serialization() {
    let store = Arc::new(Store::new());
    seed_users(&store);
    let queue = NotificationQueue::new(
        Arc::clone(&store),
        ScriptedDelivery::always_succeed(),
        queue_config(),
    );
    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());

    let response = publisher.publish(&request("user1", "json")).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["notifications_queued"], 2);
    assert_eq!(json["message"], "Post published, 2 notifications queued");
}

#[tokio::test]
async fn test_sample_data_fan_out() {
    let store = Arc::new(Store::new());
    store.seed_sample_data();

    let mut queue = NotificationQueue::new(
        Arc::clone(&store),
        ScriptedDelivery::always_succeed(),
        queue_config(),
    );
    queue.start().unwrap();
    let publisher = PostPublisher::new(Arc::clone(&store), queue.handle());

    let response = publisher.publish(&request("u1", "Hello again")).await.unwrap();
    assert_eq!(response.notifications_queued, 3);
    queue.stop().await;

    let n = &store.notifications_for("u2")[0];
    assert_eq!(n.content, "alice posted: Hello again");
}
