//! # World Synchronization Server
//!
//! Authoritative server for a shared 3D world. It accepts many concurrent
//! client sessions over WebSocket, keeps the position, orientation and action
//! of every session, validates and gates their updates, and fans change
//! notifications (movement, chat, join and leave) out to every other session.
//!
//! ## Core Responsibilities
//!
//! ### Session Lifecycle
//! Each connection becomes a session that walks a two-phase join handshake
//! (`ready`, then `ready2`) before it becomes visible to anyone else. Sessions
//! end on explicit disconnect, protocol violation or keepalive timeout, and
//! every end goes through the same close path.
//!
//! ### Move Validation
//! Movement is untrusted input. A move must echo the single-use key the
//! server issued after the previous accepted move, and may not cover more
//! than a fixed distance. Violations close the session.
//!
//! ### Broadcasting
//! Events are delivered per recipient into bounded queues, fire-and-forget.
//! A slow client only loses its own packets.
//!
//! ## Architecture Design
//!
//! ### Single Hub
//! All session state is owned by one hub task. Connection tasks forward
//! inbound frames, keepalive ticks and disconnects over a channel, so every
//! mutation is applied sequentially and broadcasts always see a consistent
//! set of sessions without any shared locks.
//!
//! ### Tasks Per Connection
//! Each connection reads frames in its own task and spawns a writer and a
//! keepalive ticker beside it, so a client that stops reading is still
//! pinged and timed out. When the hub closes a session, the writer gets a
//! short grace period to flush, then the socket is dropped and the ticker
//! cancelled.
//!
//! ## Module Organization
//!
//! - `session`: per-connection state, phases, close reasons, outbound queue
//! - `registry`: identifier to session map for sessions past `ready`
//! - `validation`: pure move checks
//! - `nonce`: move key generation
//! - `fanout`: per-recipient broadcast
//! - `chat`: bounded chat history
//! - `keepalive`: liveness challenge
//! - `lifecycle`: the handshake state machine tying it all together
//! - `network`: WebSocket transport and the hub loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use worldsync_server::config::ServerConfig;
//! use worldsync_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "0.0.0.0:12345".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod fanout;
pub mod keepalive;
pub mod lifecycle;
pub mod network;
pub mod nonce;
pub mod registry;
pub mod session;
pub mod validation;
