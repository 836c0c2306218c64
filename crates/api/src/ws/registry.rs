//! Connection registry: live operator sessions and their topic
//! subscriptions.
//!
//! All session and subscription state lives behind one `RwLock`, so every
//! mutation (register, unregister, subscribe, unsubscribe) is atomic with
//! respect to the topic index: a removed session leaves no dangling
//! reference in any topic set, and no external code ever touches the maps
//! directly.
//!
//! Delivery is point-in-time: `publish` reaches the sessions subscribed at
//! the moment of the call; there is no buffering or replay. A session whose
//! channel has closed (disconnect racing a publish) is simply skipped --
//! its registry entry is cleaned up by the handler's disconnect path.

use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use fleetwatch_core::topic::Topic;
use fleetwatch_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// State for a single registered session.
struct SessionEntry {
    /// Authenticated user that owns this session.
    user_id: DbId,
    /// The user's role at connect time. Role gates live in the protocol
    /// handler, which carries the authenticated role itself.
    #[allow(dead_code)]
    role: String,
    /// Channel sender for outbound messages to this connection.
    sender: WsSender,
    /// When this connection was established.
    #[allow(dead_code)]
    connected_at: Timestamp,
    /// Topics this session is currently subscribed to.
    subscriptions: HashSet<Topic>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<String, SessionEntry>,
    /// Reverse index: topic -> subscribed connection ids. Kept in lockstep
    /// with `SessionEntry::subscriptions`; empty sets are pruned.
    topics: HashMap<Topic, HashSet<String>>,
}

/// Manages all active WebSocket sessions and their topic subscriptions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Register a new session.
    ///
    /// The session is automatically subscribed to its own `user:<id>`
    /// topic so targeted frames reach every one of the user's tabs.
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn register(
        &self,
        conn_id: String,
        user_id: DbId,
        role: String,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let own_topic = Topic::User(user_id);

        let mut inner = self.inner.write().await;
        inner.sessions.insert(
            conn_id.clone(),
            SessionEntry {
                user_id,
                role,
                sender: tx,
                connected_at: chrono::Utc::now(),
                subscriptions: HashSet::from([own_topic]),
            },
        );
        inner.topics.entry(own_topic).or_default().insert(conn_id);
        rx
    }

    /// Remove a session and every topic reference to it atomically.
    pub async fn unregister(&self, conn_id: &str) {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.sessions.remove(conn_id) else {
            return;
        };
        for topic in entry.subscriptions {
            if let Some(members) = inner.topics.get_mut(&topic) {
                members.remove(conn_id);
                if members.is_empty() {
                    inner.topics.remove(&topic);
                }
            }
        }
    }

    /// Subscribe a session to a topic.
    ///
    /// Entity existence is the caller's concern; the registry only records
    /// the subscription. Returns `false` when the connection is unknown
    /// (it disconnected while the request was in flight).
    pub async fn subscribe(&self, conn_id: &str, topic: Topic) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.sessions.get_mut(conn_id) else {
            return false;
        };
        entry.subscriptions.insert(topic);
        inner
            .topics
            .entry(topic)
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Unsubscribe a session from a topic.
    ///
    /// Idempotent: unsubscribing from a topic never joined is not an error.
    pub async fn unsubscribe(&self, conn_id: &str, topic: Topic) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.sessions.get_mut(conn_id) {
            entry.subscriptions.remove(&topic);
        }
        if let Some(members) = inner.topics.get_mut(&topic) {
            members.remove(conn_id);
            if members.is_empty() {
                inner.topics.remove(&topic);
            }
        }
    }

    /// Deliver a message to every session currently subscribed to a topic.
    ///
    /// Sessions subscribing after this call do not receive the message.
    /// Returns the number of sessions the message was sent to; sessions
    /// with closed channels are skipped.
    pub async fn publish(&self, topic: &Topic, message: Message) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.topics.get(topic) else {
            return 0;
        };
        let mut count = 0;
        for conn_id in members {
            if let Some(entry) = inner.sessions.get(conn_id) {
                if entry.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Deliver a message once to every session subscribed to *any* of the
    /// given topics.
    ///
    /// A session subscribed to several of the topics (e.g. a device topic
    /// and the global feed) still receives exactly one copy.
    pub async fn publish_to_any(&self, topics: &[Topic], message: Message) -> usize {
        let inner = self.inner.read().await;
        let mut targets: HashSet<&String> = HashSet::new();
        for topic in topics {
            if let Some(members) = inner.topics.get(topic) {
                targets.extend(members.iter());
            }
        }
        let mut count = 0;
        for conn_id in targets {
            if let Some(entry) = inner.sessions.get(conn_id) {
                if entry.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Send a message to one specific session.
    ///
    /// Returns `false` when the session is gone or its channel is closed.
    pub async fn send_to_session(&self, conn_id: &str, message: Message) -> bool {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(conn_id)
            .is_some_and(|entry| entry.sender.send(message).is_ok())
    }

    /// Send a message to all sessions belonging to a specific user.
    ///
    /// Returns the number of sessions the message was sent to.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let inner = self.inner.read().await;
        let mut count = 0;
        for entry in inner.sessions.values() {
            if entry.user_id == user_id && entry.sender.send(message.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Return the current number of active sessions.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Number of sessions currently subscribed to a topic.
    pub async fn topic_session_count(&self, topic: &Topic) -> usize {
        self.inner
            .read()
            .await
            .topics
            .get(topic)
            .map_or(0, HashSet::len)
    }

    /// Send a Ping frame to every connected session.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for entry in inner.sessions.values() {
            let _ = entry.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every session, then clear all state.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.sessions.len();
        for entry in inner.sessions.values() {
            let _ = entry.sender.send(Message::Close(None));
        }
        inner.sessions.clear();
        inner.topics.clear();
        tracing::info!(count, "Closed all WebSocket sessions");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
