use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use zkpret_core::job_events::{JobEvent, JobNotifier, MSG_TYPE_CONNECTION};
use zkpret_core::types::Timestamp;

/// Outbound messages queued per connection before it counts as slow.
pub const CONNECTION_QUEUE_CAPACITY: usize = 256;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::Sender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Delivery is best-effort: a connection
/// whose queue is full or closed is skipped without affecting the others.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// The connection acknowledgement is queued before the connection joins
    /// the broadcast set, so it is always the first message delivered.
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        let _ = tx.try_send(Message::Text(connection_ack().into()));

        let conn = WsConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Returns the number of connections the message was queued for.
    pub async fn broadcast(&self, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut delivered = 0;
        for (conn_id, conn) in conns.iter() {
            match conn.sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(conn_id = %conn_id, "WebSocket queue full, dropping message");
                }
                // Cleaned up by the connection's own receive loop.
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server exits.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.try_send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.try_send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobNotifier for WsManager {
    async fn notify(&self, event: JobEvent) {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(job_id = %event.job_id, error = %e, "Failed to serialize job event");
                return;
            }
        };
        let delivered = self.broadcast(Message::Text(text.into())).await;
        tracing::debug!(
            job_id = %event.job_id,
            status = %event.status,
            delivered,
            "Job update broadcast",
        );
    }
}

fn connection_ack() -> String {
    json!({
        "type": MSG_TYPE_CONNECTION,
        "status": "connected",
        "message": "Connected to job updates",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
    .to_string()
}
