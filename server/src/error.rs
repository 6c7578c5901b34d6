use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures of the listener or of a single connection task.
///
/// None of these are fatal to the server: a connection error ends that
/// connection only.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Packet encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Connection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Session hub is no longer running")]
    HubClosed,
}
