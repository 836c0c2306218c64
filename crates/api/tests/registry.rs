//! Unit tests for `ConnectionRegistry`.
//!
//! These tests exercise the session registry directly, without performing
//! any HTTP upgrades. They verify register/unregister semantics, topic
//! subscription bookkeeping, point-in-time publish delivery, and graceful
//! shutdown behaviour.

use assert_matches::assert_matches;
use axum::extract::ws::Message;
use fleetwatch_api::ws::ConnectionRegistry;
use fleetwatch_core::topic::Topic;

fn text(msg: &str) -> Message {
    Message::Text(msg.into())
}

// ---------------------------------------------------------------------------
// Test: new registry starts with zero sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_registry_has_zero_sessions() {
    let registry = ConnectionRegistry::new();

    assert_eq!(registry.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: register() increments the session count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_increments_session_count() {
    let registry = ConnectionRegistry::new();

    let _rx = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;

    assert_eq!(registry.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: register() auto-subscribes the session to its own user topic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_subscribes_to_own_user_topic() {
    let registry = ConnectionRegistry::new();

    let mut rx = registry
        .register("conn-1".to_string(), 7, "viewer".to_string())
        .await;

    assert_eq!(registry.topic_session_count(&Topic::User(7)).await, 1);

    let delivered = registry.publish(&Topic::User(7), text("for you")).await;
    assert_eq!(delivered, 1);
    let msg = rx.recv().await.expect("session should receive user frame");
    assert!(matches!(&msg, Message::Text(t) if *t == "for you"));
}

// ---------------------------------------------------------------------------
// Test: unregister() removes the session from every subscribed topic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_leaves_no_topic_references() {
    let registry = ConnectionRegistry::new();

    let _rx = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;

    // Subscribe to several topics, then unregister.
    let topics = [
        Topic::Device(10),
        Topic::Device(11),
        Topic::Location(3),
        Topic::GlobalAlerts,
    ];
    for topic in topics {
        assert!(registry.subscribe("conn-1", topic).await);
    }

    registry.unregister("conn-1").await;

    assert_eq!(registry.connection_count().await, 0);
    for topic in topics {
        assert_eq!(
            registry.topic_session_count(&topic).await,
            0,
            "topic {topic} retained a dead session"
        );
    }
    assert_eq!(registry.topic_session_count(&Topic::User(1)).await, 0);
}

// ---------------------------------------------------------------------------
// Test: unregister() with unknown ID is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_unknown_id_is_noop() {
    let registry = ConnectionRegistry::new();

    let _rx = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;
    registry.unregister("nonexistent").await;

    assert_eq!(registry.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: publish() reaches only subscribed sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_reaches_only_subscribers() {
    let registry = ConnectionRegistry::new();

    let mut rx1 = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;
    let mut rx2 = registry
        .register("conn-2".to_string(), 2, "operator".to_string())
        .await;

    registry.subscribe("conn-1", Topic::Device(42)).await;

    let delivered = registry.publish(&Topic::Device(42), text("reading")).await;
    assert_eq!(delivered, 1);

    let msg = rx1.recv().await.expect("subscriber should receive");
    assert!(matches!(&msg, Message::Text(t) if *t == "reading"));

    // conn-2 never subscribed; its channel must stay empty.
    assert!(rx2.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: publishing to a topic with no subscribers delivers nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_to_empty_topic_delivers_nothing() {
    let registry = ConnectionRegistry::new();

    let delivered = registry.publish(&Topic::Device(999), text("void")).await;
    assert_eq!(delivered, 0);
}

// ---------------------------------------------------------------------------
// Test: a session subscribing after publish does not receive the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_subscriber_gets_no_replay() {
    let registry = ConnectionRegistry::new();

    let mut rx = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;

    registry.publish(&Topic::Device(5), text("before")).await;
    registry.subscribe("conn-1", Topic::Device(5)).await;

    assert!(
        rx.try_recv().is_err(),
        "delivery is point-in-time, no buffering or replay"
    );
}

// ---------------------------------------------------------------------------
// Test: unsubscribe() is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let registry = ConnectionRegistry::new();

    let mut rx = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;

    // Never subscribed -- must not error or disturb anything.
    registry.unsubscribe("conn-1", Topic::Device(42)).await;

    registry.subscribe("conn-1", Topic::Device(42)).await;
    registry.unsubscribe("conn-1", Topic::Device(42)).await;
    registry.unsubscribe("conn-1", Topic::Device(42)).await;

    let delivered = registry.publish(&Topic::Device(42), text("gone")).await;
    assert_eq!(delivered, 0);
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: publish_to_any() delivers one copy to overlapping audiences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_to_any_deduplicates_across_topics() {
    let registry = ConnectionRegistry::new();

    let mut rx = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;

    registry.subscribe("conn-1", Topic::Device(42)).await;
    registry.subscribe("conn-1", Topic::GlobalAlerts).await;

    let delivered = registry
        .publish_to_any(&[Topic::Device(42), Topic::GlobalAlerts], text("alert"))
        .await;
    assert_eq!(delivered, 1, "one session, one copy");

    let msg = rx.recv().await.expect("should receive the frame");
    assert!(matches!(&msg, Message::Text(t) if *t == "alert"));
    assert!(rx.try_recv().is_err(), "no duplicate frame");
}

// ---------------------------------------------------------------------------
// Test: publish() skips sessions with closed channels
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_skips_closed_channels() {
    let registry = ConnectionRegistry::new();

    let rx1 = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;
    let mut rx2 = registry
        .register("conn-2".to_string(), 2, "operator".to_string())
        .await;

    registry.subscribe("conn-1", Topic::GlobalAlerts).await;
    registry.subscribe("conn-2", Topic::GlobalAlerts).await;

    // Drop rx1 to close its channel (disconnect racing the publish).
    drop(rx1);

    let delivered = registry
        .publish(&Topic::GlobalAlerts, text("still alive"))
        .await;
    assert_eq!(delivered, 1);

    let msg = rx2.recv().await.expect("rx2 should receive publish");
    assert!(matches!(&msg, Message::Text(t) if *t == "still alive"));
}

// ---------------------------------------------------------------------------
// Test: send_to_user() reaches every one of the user's sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_user_reaches_all_tabs() {
    let registry = ConnectionRegistry::new();

    let mut rx1 = registry
        .register("tab-1".to_string(), 9, "viewer".to_string())
        .await;
    let mut rx2 = registry
        .register("tab-2".to_string(), 9, "viewer".to_string())
        .await;
    let mut rx3 = registry
        .register("other".to_string(), 10, "viewer".to_string())
        .await;

    let delivered = registry.send_to_user(9, text("hello")).await;
    assert_eq!(delivered, 2);

    assert!(rx1.recv().await.is_some());
    assert!(rx2.recv().await.is_some());
    assert!(rx3.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() sends Close and clears all state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let registry = ConnectionRegistry::new();

    let mut rx1 = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;
    let mut rx2 = registry
        .register("conn-2".to_string(), 2, "operator".to_string())
        .await;
    registry.subscribe("conn-1", Topic::GlobalAlerts).await;
    assert_eq!(registry.connection_count().await, 2);

    registry.shutdown_all().await;

    // Session and topic state should be empty after shutdown.
    assert_eq!(registry.connection_count().await, 0);
    assert_eq!(registry.topic_session_count(&Topic::GlobalAlerts).await, 0);

    // Both receivers should have received a Close message.
    let msg1 = rx1.recv().await.expect("rx1 should receive Close");
    assert_matches!(msg1, Message::Close(None));

    let msg2 = rx2.recv().await.expect("rx2 should receive Close");
    assert_matches!(msg2, Message::Close(None));

    // After Close, the channel should be closed (no more messages).
    assert!(
        rx1.recv().await.is_none(),
        "Channel should be closed after shutdown"
    );
}

// ---------------------------------------------------------------------------
// Test: re-registering a connection ID replaces the previous session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_id_replaces_previous_session() {
    let registry = ConnectionRegistry::new();

    let _rx_old = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;
    assert_eq!(registry.connection_count().await, 1);

    // Re-register with the same ID -- should replace, not duplicate.
    let mut rx_new = registry
        .register("conn-1".to_string(), 1, "operator".to_string())
        .await;
    assert_eq!(registry.connection_count().await, 1);

    registry.subscribe("conn-1", Topic::GlobalAlerts).await;
    registry
        .publish(&Topic::GlobalAlerts, text("replaced"))
        .await;
    let msg = rx_new.recv().await.expect("New rx should receive message");
    assert!(matches!(&msg, Message::Text(t) if *t == "replaced"));
}

// ---------------------------------------------------------------------------
// Test: concurrent subscribes and unregisters keep the registry consistent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_churn_leaves_no_residue() {
    let registry = std::sync::Arc::new(ConnectionRegistry::new());

    let mut handles = Vec::new();
    for i in 0..16i64 {
        let registry = std::sync::Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let conn_id = format!("conn-{i}");
            let _rx = registry
                .register(conn_id.clone(), i, "operator".to_string())
                .await;
            for d in 0..8 {
                registry.subscribe(&conn_id, Topic::Device(d)).await;
            }
            registry.subscribe(&conn_id, Topic::GlobalAlerts).await;
            registry.unregister(&conn_id).await;
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    assert_eq!(registry.connection_count().await, 0);
    for d in 0..8 {
        assert_eq!(registry.topic_session_count(&Topic::Device(d)).await, 0);
    }
    assert_eq!(registry.topic_session_count(&Topic::GlobalAlerts).await, 0);
}
