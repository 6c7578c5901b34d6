//! Wire protocol shared between the synchronization server and its clients.
//!
//! Every WebSocket text frame carries one JSON object of the form
//! `{"kind": "<kind>", "data": <payload>}`. Payload-less kinds omit `data`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_PORT: u16 = 12345;
pub const MAX_MOVE_DISTANCE: f64 = 10.0;
pub const KEEPALIVE_INTERVAL_SECS: u64 = 10;

/// Process-lifetime-unique session identifier.
pub type SessionId = u64;

/// Milliseconds since the Unix epoch on the server clock.
pub fn server_time() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    (millis.min(u64::MAX as u128)) as u64
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Animation state of an entity, carried on the wire as a small integer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Action {
    #[default]
    Idle,
    Walk,
    Run,
}

impl TryFrom<u8> for Action {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Idle),
            1 => Ok(Action::Walk),
            2 => Ok(Action::Run),
            other => Err(format!("unknown action id {}", other)),
        }
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        match action {
            Action::Idle => 0,
            Action::Walk => 1,
            Action::Run => 2,
        }
    }
}

/// Single-use token gating a session's next accepted move.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MoveKey(String);

impl MoveKey {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MoveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renderable state of one session as seen by its peers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    pub uuid: SessionId,
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub head_yaw: f64,
    pub action_id: Action,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RosterEntry {
    pub uuid: SessionId,
    pub entity: EntityState,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub uuid: SessionId,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub time: u64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub head_yaw: f64,
    pub action_id: Action,
    #[serde(default)]
    pub key: Option<MoveKey>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

/// Messages sent by clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ClientPacket {
    Ready,
    Ready2,
    Move(MoveRequest),
    Chat(ChatRequest),
    Pong,
}

impl ClientPacket {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the packet kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientPacket::Ready => "ready",
            ClientPacket::Ready2 => "ready2",
            ClientPacket::Move(_) => "move",
            ClientPacket::Chat(_) => "chat",
            ClientPacket::Pong => "pong",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OpenPayload {
    pub time: u64,
    pub uuid: SessionId,
    pub chat: Vec<ChatEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AddEntitiesPayload {
    pub time: u64,
    pub uuid: SessionId,
    pub entities: Vec<RosterEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityPayload {
    pub time: u64,
    pub entity: EntityState,
    pub uuid: SessionId,
    /// Present only in the copy delivered to the session that moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_key: Option<MoveKey>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatPayload {
    pub time: u64,
    pub uuid: SessionId,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PingPayload {
    pub time: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KickedPayload {
    pub time: u64,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RemoveEntityPayload {
    pub time: u64,
    pub uuid: SessionId,
    pub entity: EntityRef,
}

/// Messages sent by the server. Top-level `uuid` fields name the recipient.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ServerPacket {
    Open(OpenPayload),
    AddEntities(AddEntitiesPayload),
    UpdateEntity(UpdateEntityPayload),
    Chat(ChatPayload),
    Ping(PingPayload),
    Kicked(KickedPayload),
    RemoveEntity(RemoveEntityPayload),
}

impl ServerPacket {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the packet kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerPacket::Open(_) => "open",
            ServerPacket::AddEntities(_) => "addEntities",
            ServerPacket::UpdateEntity(_) => "updateEntity",
            ServerPacket::Chat(_) => "chat",
            ServerPacket::Ping(_) => "ping",
            ServerPacket::Kicked(_) => "kicked",
            ServerPacket::RemoveEntity(_) => "removeEntity",
        }
    }
}
