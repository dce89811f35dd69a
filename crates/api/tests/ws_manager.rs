//! Unit tests for `WsManager`.
//!
//! These exercise the WebSocket connection manager directly, without
//! performing any HTTP upgrades. They verify add/remove semantics, the
//! connection acknowledgement, best-effort broadcast delivery, and shutdown.

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::mpsc;
use zkpret_api::ws::manager::CONNECTION_QUEUE_CAPACITY;
use zkpret_api::ws::WsManager;
use zkpret_core::job::{Job, JobStatus};
use zkpret_core::job_events::{JobEvent, JobNotifier};

/// Helper: receive the next message and parse it as JSON text.
fn next_json(rx: &mut mpsc::Receiver<Message>) -> serde_json::Value {
    match rx.try_recv().expect("a queued message") {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("JSON text"),
        other => panic!("expected text message, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: add/remove track the connection count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);

    let _rx1 = manager.add("conn-1".to_string()).await;
    let _rx2 = manager.add("conn-2".to_string()).await;
    assert_eq!(manager.connection_count().await, 2);

    manager.remove("conn-1").await;
    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: the connection acknowledgement is the first message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_ack_is_first_message() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;

    let ack = next_json(&mut rx);
    assert_eq!(ack["type"], "connection");
    assert_eq!(ack["status"], "connected");
    assert!(rx.try_recv().is_err(), "nothing else is queued");
}

// ---------------------------------------------------------------------------
// Test: job events reach every subscriber as job_update messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_broadcasts_job_update_to_all() {
    let manager = WsManager::new();
    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;
    next_json(&mut rx1);
    next_json(&mut rx2);

    let mut job = Job::new("job_1".into(), "verify-A", serde_json::json!({}));
    job.status = JobStatus::Running;
    job.progress = 10;
    manager.notify(JobEvent::from_job(&job)).await;

    for rx in [&mut rx1, &mut rx2] {
        let event = next_json(rx);
        assert_eq!(event["type"], "job_update");
        assert_eq!(event["jobId"], "job_1");
        assert_eq!(event["status"], "running");
        assert_eq!(event["progress"], 10);
        assert!(event["timestamp"].is_string());
    }
}

// ---------------------------------------------------------------------------
// Test: a full or closed subscriber does not block the others
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_and_closed_subscribers_are_skipped() {
    let manager = WsManager::new();
    let _slow = manager.add("slow".to_string()).await;
    let closed = manager.add("closed".to_string()).await;
    let mut healthy = manager.add("healthy".to_string()).await;
    drop(closed);

    // Fill the slow subscriber's queue (the ack already holds one slot).
    for _ in 0..CONNECTION_QUEUE_CAPACITY {
        manager.broadcast(Message::Text("filler".into())).await;
        while healthy.try_recv().is_ok() {}
    }

    let delivered = manager.broadcast(Message::Text("latest".into())).await;
    assert_eq!(delivered, 1, "only the healthy subscriber had room");

    match healthy.try_recv().expect("healthy got the message") {
        Message::Text(text) => assert_eq!(text.as_str(), "latest"),
        other => panic!("unexpected message {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: ping_all sends a Ping frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_all_sends_ping() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;
    next_json(&mut rx);

    manager.ping_all().await;

    assert_eq!(rx.try_recv().expect("ping"), Message::Ping(Bytes::new()));
}

// ---------------------------------------------------------------------------
// Test: shutdown_all sends Close and clears the map
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;
    next_json(&mut rx);

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert_eq!(rx.try_recv().expect("close"), Message::Close(None));
}
