//! WebSocket job-update subscriptions.
//!
//! Provides connection management, heartbeat pings, and the HTTP upgrade
//! handler used by Axum routes. [`WsManager`] is also the job runner's
//! notifier.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
