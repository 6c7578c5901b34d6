//! Per-connection session state
//!
//! A session is created when the transport accepts a connection and walks
//! `Connecting -> Ready -> Prepared -> Closed`. It is visible to peers (in
//! broadcasts and entity lists) only while `Prepared`.

use log::{debug, warn};
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use worldsync_shared::{
    Action, EntityState, MoveKey, MoveRequest, RosterEntry, ServerPacket, SessionId, Vec3,
};

/// Handshake progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport accepted, waiting for `ready`
    Connecting,
    /// Identity and chat history sent, waiting for `ready2`
    Ready,
    /// Visible to and of all other prepared sessions
    Prepared,
    Closed,
}

/// Why a session was closed. The text is shown to the closed client and to
/// its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    LoginTimeout,
    Timeout,
    IllegalMove,
    UnauthorizedMove,
    ClientDisconnect,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::LoginTimeout => "login timeout",
            CloseReason::Timeout => "timeout",
            CloseReason::IllegalMove => "illegal move packet",
            CloseReason::UnauthorizedMove => "unauthorized move packet",
            CloseReason::ClientDisconnect => "client disconnect",
        }
    }

    /// Whether the closed client should still be sent a `kicked` notice.
    /// A client that dropped the transport itself has nobody listening.
    pub fn notifies_client(&self) -> bool {
        !matches!(self, CloseReason::ClientDisconnect)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded outbound queue feeding one connection's writer.
///
/// Delivery never blocks: a full or closed queue drops the packet. Dropping
/// the outbox resolves [`Outbound::closed`], even while the writer is stuck
/// on a socket that no longer drains.
#[derive(Debug)]
pub struct Outbox {
    sender: mpsc::Sender<ServerPacket>,
    _closed: oneshot::Sender<()>,
}

/// Connection side of an [`Outbox`]
#[derive(Debug)]
pub struct Outbound {
    pub packets: mpsc::Receiver<ServerPacket>,
    /// Resolves (with an error) once the outbox has been dropped
    pub closed: oneshot::Receiver<()>,
}

impl Outbox {
    pub fn connect(capacity: usize) -> (Self, Outbound) {
        let (sender, packets) = mpsc::channel(capacity.max(1));
        let (closed_tx, closed) = oneshot::channel();
        (
            Self {
                sender,
                _closed: closed_tx,
            },
            Outbound { packets, closed },
        )
    }

    /// Outbox with only the packet side kept.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerPacket>) {
        let (outbox, outbound) = Self::connect(capacity);
        (outbox, outbound.packets)
    }

    /// Queues a packet for the connection. Returns false if it was dropped.
    pub fn deliver(&self, packet: ServerPacket) -> bool {
        match self.sender.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(packet)) => {
                warn!("Outbox full, dropping {} packet", packet.kind());
                false
            }
            Err(TrySendError::Closed(packet)) => {
                debug!("Outbox closed, dropping {} packet", packet.kind());
                false
            }
        }
    }
}

/// Server-side state for one connected client
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub phase: SessionPhase,
    pub position: Vec3,
    /// Orientation in radians
    pub yaw: f64,
    pub pitch: f64,
    pub head_yaw: f64,
    pub action: Action,
    /// A keepalive ping is outstanding
    pub pending_ping: bool,
    /// Token the next accepted move must echo, once one has been issued
    pub move_key: Option<MoveKey>,
    outbox: Outbox,
}

impl Session {
    /// Creates a session at the origin, facing forward and idle.
    pub fn new(id: SessionId, outbox: Outbox) -> Self {
        Self {
            id,
            phase: SessionPhase::Connecting,
            position: Vec3::default(),
            yaw: 0.0,
            pitch: 0.0,
            head_yaw: 0.0,
            action: Action::Idle,
            pending_ping: false,
            move_key: None,
            outbox,
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.phase == SessionPhase::Prepared
    }

    pub fn send(&self, packet: ServerPacket) -> bool {
        self.outbox.deliver(packet)
    }

    /// Commits a validated move to the session.
    pub fn apply_move(&mut self, request: &MoveRequest) {
        self.position = request.position;
        self.yaw = request.yaw;
        self.pitch = request.pitch;
        self.head_yaw = request.head_yaw;
        self.action = request.action_id;
    }

    pub fn entity_state(&self) -> EntityState {
        EntityState {
            uuid: self.id,
            position: self.position,
            yaw: self.yaw,
            pitch: self.pitch,
            head_yaw: self.head_yaw,
            action_id: self.action,
        }
    }

    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            uuid: self.id,
            entity: self.entity_state(),
        }
    }
}
