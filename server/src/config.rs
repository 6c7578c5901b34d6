//! Runtime settings for the synchronization server.

use std::time::Duration;
use worldsync_shared::{DEFAULT_PORT, KEEPALIVE_INTERVAL_SECS, MAX_MOVE_DISTANCE};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub bind_addr: String,
    /// Period of the per-session liveness challenge
    pub keepalive_interval: Duration,
    /// Largest distance a single accepted move may cover
    pub max_move_distance: f64,
    /// Number of chat lines kept for replay to joining sessions
    pub chat_history_limit: usize,
    /// Longest chat line accepted, in characters; longer lines are truncated
    pub max_chat_length: usize,
    /// Outbound packets buffered per session before deliveries are dropped
    pub outbox_capacity: usize,
    /// Period of the full-roster refresh broadcast, `None` to disable
    pub roster_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            keepalive_interval: Duration::from_secs(KEEPALIVE_INTERVAL_SECS),
            max_move_distance: MAX_MOVE_DISTANCE,
            chat_history_limit: 100,
            max_chat_length: 256,
            outbox_capacity: 256,
            roster_interval: Some(Duration::from_secs(30)),
        }
    }
}
