//! Connection lifecycle controller
//!
//! Drives every session through `Connecting -> Ready -> Prepared -> Closed`
//! and wires the registry, move validation, fan-out, chat log and keepalive
//! together. All inbound events pass through [`LifecycleController`], which
//! is owned by a single hub task, so per-session updates apply in receipt
//! order and broadcasts always see a consistent set of sessions.
//!
//! ## Handshake
//!
//! 1. `ready`: the session is registered (still invisible) and receives
//!    `open` with its identifier, the server time and the chat history.
//! 2. `ready2`: the session becomes prepared, a "connected" line is added to
//!    the chat log and broadcast, then every prepared session (the new one
//!    included) receives `addEntities` with the full roster.
//!
//! Only prepared sessions may `move` or `chat`. Every close funnels through
//! [`LifecycleController::close`].

use crate::chat::{sanitize_message, ChatLog};
use crate::config::ServerConfig;
use crate::fanout::broadcast;
use crate::keepalive;
use crate::nonce::generate_move_key;
use crate::registry::SessionRegistry;
use crate::session::{CloseReason, Outbox, Session, SessionPhase};
use crate::validation::validate_move;
use log::{debug, info, warn};
use std::collections::HashMap;
use worldsync_shared::{
    server_time, AddEntitiesPayload, ChatPayload, ClientPacket, EntityRef, KickedPayload,
    MoveRequest, OpenPayload, RemoveEntityPayload, ServerPacket, SessionId,
    UpdateEntityPayload,
};

pub struct LifecycleController {
    /// Sessions accepted by the transport that have not sent `ready`
    pending: HashMap<SessionId, Session>,
    registry: SessionRegistry,
    chat: ChatLog,
    next_session_id: SessionId,
    max_move_distance: f64,
    max_chat_length: usize,
}

impl LifecycleController {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            pending: HashMap::new(),
            registry: SessionRegistry::new(),
            chat: ChatLog::new(config.chat_history_limit),
            next_session_id: 1,
            max_move_distance: config.max_move_distance,
            max_chat_length: config.max_chat_length,
        }
    }

    /// Creates a session for a freshly accepted connection.
    ///
    /// Identifiers start at 1 and are never reused.
    pub fn connect(&mut self, outbox: Outbox) -> SessionId {
        let id = self.next_session_id;
        self.next_session_id += 1;

        info!("[session #{}] waiting for authentication", id);
        self.pending.insert(id, Session::new(id, outbox));
        id
    }

    /// Dispatches one inbound packet according to the session's phase.
    ///
    /// Packets for closed or unknown sessions are ignored.
    pub fn handle_packet(&mut self, id: SessionId, packet: ClientPacket) {
        let Some(phase) = self.phase_of(id) else {
            debug!("Ignoring {} for absent session #{}", packet.kind(), id);
            return;
        };

        match (phase, packet) {
            (_, ClientPacket::Pong) => self.on_pong(id),
            (_, ClientPacket::Move(request)) => self.on_move(id, request),
            (SessionPhase::Connecting, ClientPacket::Ready) => self.on_ready(id),
            (SessionPhase::Ready, ClientPacket::Ready2) => self.on_ready2(id),
            (SessionPhase::Prepared, ClientPacket::Chat(request)) => {
                self.on_chat(id, &request.message)
            }
            (phase, packet) => {
                debug!(
                    "[session #{}] ignoring {} while {:?}",
                    id,
                    packet.kind(),
                    phase
                );
            }
        }
    }

    /// Runs the keepalive check for one session.
    pub fn keepalive_tick(&mut self, id: SessionId) {
        let verdict = match self.session_mut(id) {
            Some(session) => match keepalive::challenge(session) {
                Ok(ping) => {
                    session.send(ServerPacket::Ping(ping));
                    Ok(())
                }
                Err(reason) => Err(reason),
            },
            None => return,
        };

        if let Err(reason) = verdict {
            self.close(id, reason);
        }
    }

    /// Handles the transport going away. Idempotent.
    pub fn disconnect(&mut self, id: SessionId) {
        self.close(id, CloseReason::ClientDisconnect);
    }

    /// Closes a session. Returns false if it was already gone.
    ///
    /// The session is removed first, so a second close for the same id
    /// finds nothing and emits nothing. Dropping the session drops its
    /// outbox, which ends the connection task once queued packets are
    /// flushed.
    pub fn close(&mut self, id: SessionId, reason: CloseReason) -> bool {
        let (mut session, registered) = if let Some(session) = self.pending.remove(&id) {
            (session, false)
        } else if let Some(session) = self.registry.remove(id) {
            (session, true)
        } else {
            return false;
        };

        session.phase = SessionPhase::Closed;
        info!("[session #{}] has disconnected: {}", id, reason);

        if reason.notifies_client() {
            let delivered = session.send(ServerPacket::Kicked(KickedPayload {
                time: server_time(),
                reason: reason.to_string(),
            }));
            if !delivered {
                info!("[session #{}] kick notice could not be queued", id);
            }
        }
        drop(session);

        if registered {
            self.announce(format!("#{} has disconnected: {}", id, reason));
            let time = server_time();
            broadcast(&self.registry, &[], |recipient| {
                ServerPacket::RemoveEntity(RemoveEntityPayload {
                    time,
                    uuid: recipient,
                    entity: EntityRef { uuid: id },
                })
            });
        }
        true
    }

    /// Sends every prepared session the full roster of prepared sessions.
    pub fn broadcast_roster(&self) -> usize {
        let entities = self.registry.roster();
        let time = server_time();
        broadcast(&self.registry, &[], |recipient| {
            ServerPacket::AddEntities(AddEntitiesPayload {
                time,
                uuid: recipient,
                entities: entities.clone(),
            })
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn chat_log(&self) -> &ChatLog {
        &self.chat
    }

    pub fn phase_of(&self, id: SessionId) -> Option<SessionPhase> {
        self.session(id).map(|session| session.phase)
    }

    /// Number of live sessions in any phase
    pub fn session_count(&self) -> usize {
        self.pending.len() + self.registry.len()
    }

    fn session(&self, id: SessionId) -> Option<&Session> {
        self.pending.get(&id).or_else(|| self.registry.get(id))
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        match self.pending.get_mut(&id) {
            Some(session) => Some(session),
            None => self.registry.get_mut(id),
        }
    }

    fn on_ready(&mut self, id: SessionId) {
        let Some(mut session) = self.pending.remove(&id) else {
            return;
        };

        info!("[session #{}] is being prepared", id);
        session.phase = SessionPhase::Ready;
        session.send(ServerPacket::Open(OpenPayload {
            time: server_time(),
            uuid: id,
            chat: self.chat.history(),
        }));
        self.registry.add(session);
    }

    fn on_ready2(&mut self, id: SessionId) {
        let Some(session) = self.registry.get_mut(id) else {
            return;
        };

        session.phase = SessionPhase::Prepared;
        info!("[session #{}] has connected", id);

        self.announce(format!("#{} has connected", id));
        self.broadcast_roster();
    }

    fn on_move(&mut self, id: SessionId, request: MoveRequest) {
        let verdict = match self.session(id) {
            Some(session) => validate_move(session, &request, self.max_move_distance),
            None => return,
        };

        if let Err(rejection) = verdict {
            match rejection.close_reason() {
                Some(reason) => {
                    warn!("[session #{}] rejected move: {}", id, rejection);
                    self.close(id, reason);
                }
                None => debug!("[session #{}] dropped move: {}", id, rejection),
            }
            return;
        }

        let Some(session) = self.registry.get_mut(id) else {
            return;
        };
        let next_key = generate_move_key();
        session.apply_move(&request);
        session.move_key = Some(next_key.clone());
        let entity = session.entity_state();

        let time = server_time();
        broadcast(&self.registry, &[], |recipient| {
            ServerPacket::UpdateEntity(UpdateEntityPayload {
                time,
                entity: entity.clone(),
                uuid: recipient,
                next_key: (recipient == id).then(|| next_key.clone()),
            })
        });
    }

    fn on_chat(&mut self, id: SessionId, raw: &str) {
        match sanitize_message(raw, self.max_chat_length) {
            Some(text) => self.announce(format!("Guest {}: {}", id, text)),
            None => debug!("[session #{}] dropped empty chat line", id),
        }
    }

    fn on_pong(&mut self, id: SessionId) {
        if let Some(session) = self.session_mut(id) {
            keepalive::answer(session);
        }
    }

    /// Appends a line to the chat log and sends it to every prepared session.
    fn announce(&mut self, message: String) {
        let entry = self.chat.append(message);
        broadcast(&self.registry, &[], |recipient| {
            ServerPacket::Chat(ChatPayload {
                time: entry.time,
                uuid: recipient,
                message: entry.message.clone(),
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use tokio::sync::mpsc;
    use worldsync_shared::{Action, ChatRequest, MoveKey, Vec3};

    struct TestConn {
        id: SessionId,
        rx: mpsc::Receiver<ServerPacket>,
    }

    impl TestConn {
        fn drain(&mut self) -> Vec<ServerPacket> {
            let mut packets = Vec::new();
            while let Ok(packet) = self.rx.try_recv() {
                packets.push(packet);
            }
            packets
        }

        /// True once the controller has dropped this session's outbox
        fn is_closed(&mut self) -> bool {
            self.drain();
            matches!(
                self.rx.try_recv(),
                Err(mpsc::error::TryRecvError::Disconnected)
            )
        }
    }

    fn controller() -> LifecycleController {
        LifecycleController::new(&ServerConfig::default())
    }

    fn connect(controller: &mut LifecycleController) -> TestConn {
        let (outbox, rx) = Outbox::channel(64);
        let id = controller.connect(outbox);
        TestConn { id, rx }
    }

    fn join(controller: &mut LifecycleController) -> TestConn {
        let mut conn = connect(controller);
        controller.handle_packet(conn.id, ClientPacket::Ready);
        controller.handle_packet(conn.id, ClientPacket::Ready2);
        conn.drain();
        conn
    }

    fn move_to(position: Vec3, key: Option<MoveKey>) -> ClientPacket {
        ClientPacket::Move(MoveRequest {
            position,
            yaw: 0.5,
            pitch: 0.25,
            head_yaw: 0.75,
            action_id: Action::Run,
            key,
        })
    }

    fn chat(message: &str) -> ClientPacket {
        ClientPacket::Chat(ChatRequest {
            message: message.to_string(),
        })
    }

    fn next_key(packets: &[ServerPacket]) -> Option<MoveKey> {
        packets.iter().find_map(|packet| match packet {
            ServerPacket::UpdateEntity(update) => update.next_key.clone(),
            _ => None,
        })
    }

    fn kicked_reason(packets: &[ServerPacket]) -> Option<String> {
        packets.iter().find_map(|packet| match packet {
            ServerPacket::Kicked(kicked) => Some(kicked.reason.clone()),
            _ => None,
        })
    }

    fn roster_ids(packets: &[ServerPacket]) -> Option<Vec<SessionId>> {
        packets.iter().find_map(|packet| match packet {
            ServerPacket::AddEntities(add) => {
                Some(add.entities.iter().map(|entry| entry.uuid).collect())
            }
            _ => None,
        })
    }

    #[test]
    fn test_session_ids_increase_and_are_not_reused() {
        let mut controller = controller();
        let a = connect(&mut controller);
        let b = connect(&mut controller);
        controller.disconnect(a.id);
        let c = connect(&mut controller);

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_session_ids_continue_past_u32_range() {
        let mut controller = controller();
        controller.next_session_id = u32::MAX as SessionId;

        let a = connect(&mut controller);
        let b = connect(&mut controller);

        assert_eq!(a.id, u32::MAX as SessionId);
        assert_eq!(b.id, u32::MAX as SessionId + 1);
        assert_eq!(controller.session_count(), 2);
    }

    #[test]
    fn test_kick_into_full_outbox_still_closes() {
        let mut controller = controller();
        let peer = join(&mut controller);
        let (outbox, mut rx) = Outbox::channel(1);
        let stalled = controller.connect(outbox);
        controller.handle_packet(stalled, ClientPacket::Ready);

        // open fills the only slot, so the kick notice is dropped
        assert!(controller.close(stalled, CloseReason::Timeout));
        assert!(matches!(rx.try_recv(), Ok(ServerPacket::Open(_))));
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(!controller.registry().contains(stalled));
        assert!(controller.registry().contains(peer.id));
    }

    #[test]
    fn test_ready_sends_open_without_visibility() {
        let mut controller = controller();
        let mut peer = join(&mut controller);
        let mut conn = connect(&mut controller);

        controller.handle_packet(conn.id, ClientPacket::Ready);

        match conn.drain().as_slice() {
            [ServerPacket::Open(open)] => {
                assert_eq!(open.uuid, conn.id);
                assert!(open.time > 0);
            }
            other => panic!("Unexpected packets {:?}", other),
        }
        assert_eq!(controller.phase_of(conn.id), Some(SessionPhase::Ready));
        assert!(controller.registry().contains(conn.id));
        assert!(peer.drain().is_empty());
        assert_eq!(controller.registry().roster().len(), 1);
    }

    #[test]
    fn test_ready2_announces_and_sends_roster_to_everyone() {
        let mut controller = controller();
        let mut first = join(&mut controller);
        let mut second = connect(&mut controller);
        controller.handle_packet(second.id, ClientPacket::Ready);
        second.drain();

        controller.handle_packet(second.id, ClientPacket::Ready2);

        for conn in [&mut first, &mut second] {
            let recipient = conn.id;
            let packets = conn.drain();
            match packets.as_slice() {
                [ServerPacket::Chat(line), ServerPacket::AddEntities(add)] => {
                    assert_eq!(line.message, "#2 has connected");
                    assert_eq!(line.uuid, recipient);
                    assert_eq!(add.uuid, recipient);
                }
                other => panic!("Unexpected packets {:?}", other),
            }
            assert_eq!(roster_ids(&packets), Some(vec![1, 2]));
        }
        assert_eq!(controller.phase_of(second.id), Some(SessionPhase::Prepared));
    }

    #[test]
    fn test_out_of_phase_handshake_is_ignored() {
        let mut controller = controller();
        let mut conn = connect(&mut controller);

        controller.handle_packet(conn.id, ClientPacket::Ready2);
        assert_eq!(controller.phase_of(conn.id), Some(SessionPhase::Connecting));
        assert!(conn.drain().is_empty());

        controller.handle_packet(conn.id, ClientPacket::Ready);
        controller.handle_packet(conn.id, ClientPacket::Ready);
        let opens = conn
            .drain()
            .into_iter()
            .filter(|p| matches!(p, ServerPacket::Open(_)))
            .count();
        assert_eq!(opens, 1);

        controller.handle_packet(conn.id, chat("too early"));
        assert!(controller.chat_log().is_empty());
    }

    #[test]
    fn test_open_replays_history_in_order() {
        let mut controller = controller();
        let first = join(&mut controller);
        controller.handle_packet(first.id, chat("hello"));
        controller.handle_packet(first.id, chat("world"));

        let mut second = connect(&mut controller);
        controller.handle_packet(second.id, ClientPacket::Ready);

        let expected = controller.chat_log().history();
        match second.drain().as_slice() {
            [ServerPacket::Open(open)] => {
                assert_eq!(open.chat, expected);
                let messages: Vec<&str> = open.chat.iter().map(|e| e.message.as_str()).collect();
                assert_eq!(
                    messages,
                    vec!["#1 has connected", "Guest 1: hello", "Guest 1: world"]
                );
            }
            other => panic!("Unexpected packets {:?}", other),
        }
    }

    #[test]
    fn test_chat_reaches_all_prepared_including_sender() {
        let mut controller = controller();
        let mut a = join(&mut controller);
        let mut b = join(&mut controller);
        a.drain();
        let mut waiting = connect(&mut controller);
        controller.handle_packet(waiting.id, ClientPacket::Ready);
        waiting.drain();

        controller.handle_packet(a.id, chat("  hi there  "));

        for conn in [&mut a, &mut b] {
            let recipient = conn.id;
            match conn.drain().as_slice() {
                [ServerPacket::Chat(line)] => {
                    assert_eq!(line.message, "Guest 1: hi there");
                    assert_eq!(line.uuid, recipient);
                }
                other => panic!("Unexpected packets {:?}", other),
            }
        }
        assert!(waiting.drain().is_empty());
    }

    #[test]
    fn test_empty_chat_is_dropped() {
        let mut controller = controller();
        let mut a = join(&mut controller);
        let before = controller.chat_log().len();

        controller.handle_packet(a.id, chat("   "));

        assert_eq!(controller.chat_log().len(), before);
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_move_commits_and_issues_key_to_mover_only() {
        let mut controller = controller();
        let mut mover = join(&mut controller);
        let mut peer = join(&mut controller);
        mover.drain();

        controller.handle_packet(mover.id, move_to(Vec3::new(1.0, 2.0, 3.0), None));

        let own = mover.drain();
        let theirs = peer.drain();
        let key = next_key(&own).expect("mover receives nextKey");
        assert_eq!(next_key(&theirs), None);

        match theirs.as_slice() {
            [ServerPacket::UpdateEntity(update)] => {
                assert_eq!(update.uuid, peer.id);
                assert_eq!(update.entity.uuid, mover.id);
                assert_eq!(update.entity.position, Vec3::new(1.0, 2.0, 3.0));
                assert_approx_eq!(update.entity.head_yaw, 0.75, 1e-9);
                assert_eq!(update.entity.action_id, Action::Run);
            }
            other => panic!("Unexpected packets {:?}", other),
        }

        let session = controller.registry().get(mover.id).unwrap();
        assert_eq!(session.move_key, Some(key));
        assert_eq!(session.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_chained_moves_commit_last_position() {
        let mut controller = controller();
        let mut mover = join(&mut controller);
        let mut key = None;

        for step in 1..=20 {
            let target = Vec3::new(step as f64 * 5.0, 0.0, -(step as f64));
            controller.handle_packet(mover.id, move_to(target, key.clone()));
            key = next_key(&mover.drain());
            assert!(key.is_some(), "move {} was not accepted", step);
        }

        let session = controller.registry().get(mover.id).unwrap();
        assert_approx_eq!(session.position.x, 100.0, 1e-9);
        assert_approx_eq!(session.position.z, -20.0, 1e-9);
    }

    #[test]
    fn test_illegal_move_kicks() {
        let mut controller = controller();
        let mut mover = join(&mut controller);
        let mut peer = join(&mut controller);
        mover.drain();

        controller.handle_packet(mover.id, move_to(Vec3::new(10.5, 0.0, 0.0), None));

        let packets = mover.drain();
        assert_eq!(kicked_reason(&packets).as_deref(), Some("illegal move packet"));
        assert!(controller.phase_of(mover.id).is_none());
        assert!(mover.is_closed());

        let notices = peer.drain();
        assert!(notices.iter().any(|p| matches!(
            p,
            ServerPacket::Chat(line) if line.message == "#1 has disconnected: illegal move packet"
        )));
        assert!(notices.iter().any(|p| matches!(
            p,
            ServerPacket::RemoveEntity(remove) if remove.entity.uuid == 1 && remove.uuid == 2
        )));
    }

    #[test]
    fn test_stale_or_missing_key_kicks() {
        for replay in [Some(MoveKey::new("forged")), None] {
            let mut controller = controller();
            let mut mover = join(&mut controller);

            controller.handle_packet(mover.id, move_to(Vec3::new(1.0, 0.0, 0.0), None));
            assert!(next_key(&mover.drain()).is_some());

            controller.handle_packet(mover.id, move_to(Vec3::new(2.0, 0.0, 0.0), replay));
            assert_eq!(
                kicked_reason(&mover.drain()).as_deref(),
                Some("unauthorized move packet")
            );
            assert!(controller.phase_of(mover.id).is_none());
        }
    }

    #[test]
    fn test_move_before_prepared_is_ignored() {
        let mut controller = controller();
        let mut conn = connect(&mut controller);

        controller.handle_packet(conn.id, move_to(Vec3::new(500.0, 0.0, 0.0), None));
        assert!(conn.drain().is_empty());
        assert_eq!(controller.phase_of(conn.id), Some(SessionPhase::Connecting));

        controller.handle_packet(conn.id, ClientPacket::Ready);
        conn.drain();
        controller.handle_packet(conn.id, move_to(Vec3::new(500.0, 0.0, 0.0), None));
        assert!(conn.drain().is_empty());
        assert_eq!(controller.phase_of(conn.id), Some(SessionPhase::Ready));
    }

    #[test]
    fn test_disconnect_notifies_peers_exactly_once() {
        let mut controller = controller();
        let mut leaver = join(&mut controller);
        let mut peer = join(&mut controller);
        leaver.drain();

        controller.disconnect(leaver.id);
        controller.disconnect(leaver.id);
        assert!(!controller.close(leaver.id, CloseReason::Timeout));

        assert_eq!(kicked_reason(&leaver.drain()), None);
        let removals = peer
            .drain()
            .into_iter()
            .filter(|p| matches!(p, ServerPacket::RemoveEntity(r) if r.entity.uuid == leaver.id))
            .count();
        assert_eq!(removals, 1);

        // Late packets from the closed session change nothing
        controller.handle_packet(leaver.id, move_to(Vec3::new(1.0, 0.0, 0.0), None));
        controller.handle_packet(leaver.id, chat("ghost"));
        assert!(peer.drain().is_empty());
        assert_eq!(controller.registry().roster().len(), 1);
    }

    #[test]
    fn test_closed_session_absent_from_later_rosters() {
        let mut controller = controller();
        let leaver = join(&mut controller);
        let mut peer = join(&mut controller);
        controller.disconnect(leaver.id);
        peer.drain();

        let _late = join(&mut controller);
        let roster = roster_ids(&peer.drain()).unwrap();
        assert!(!roster.contains(&leaver.id));
    }

    #[test]
    fn test_keepalive_login_timeout() {
        let mut controller = controller();
        let mut peer = join(&mut controller);
        let mut conn = connect(&mut controller);

        controller.keepalive_tick(conn.id);

        assert_eq!(
            kicked_reason(&conn.drain()).as_deref(),
            Some("login timeout")
        );
        assert!(controller.phase_of(conn.id).is_none());
        // Never registered, so peers hear nothing
        assert!(peer.drain().is_empty());
    }

    #[test]
    fn test_keepalive_login_timeout_after_ready() {
        let mut controller = controller();
        let mut peer = join(&mut controller);
        let mut conn = connect(&mut controller);
        controller.handle_packet(conn.id, ClientPacket::Ready);
        conn.drain();

        controller.keepalive_tick(conn.id);

        assert_eq!(
            kicked_reason(&conn.drain()).as_deref(),
            Some("login timeout")
        );
        let packets = peer.drain();
        assert!(packets
            .iter()
            .any(|p| matches!(p, ServerPacket::RemoveEntity(r) if r.entity.uuid == conn.id)));
        assert!(roster_ids(&packets).is_none());
    }

    #[test]
    fn test_keepalive_ping_pong_and_timeout() {
        let mut controller = controller();
        let mut conn = join(&mut controller);

        controller.keepalive_tick(conn.id);
        assert!(matches!(conn.drain().as_slice(), [ServerPacket::Ping(_)]));

        controller.handle_packet(conn.id, ClientPacket::Pong);
        controller.keepalive_tick(conn.id);
        assert!(matches!(conn.drain().as_slice(), [ServerPacket::Ping(_)]));

        controller.keepalive_tick(conn.id);
        assert_eq!(kicked_reason(&conn.drain()).as_deref(), Some("timeout"));
        assert!(controller.phase_of(conn.id).is_none());
    }

    #[test]
    fn test_two_sessions_join_scenario() {
        let mut controller = controller();
        let mut one = connect(&mut controller);
        let mut two = connect(&mut controller);

        controller.handle_packet(one.id, ClientPacket::Ready);
        controller.handle_packet(one.id, ClientPacket::Ready2);
        controller.handle_packet(one.id, chat("anyone here?"));
        one.drain();

        controller.handle_packet(two.id, ClientPacket::Ready);
        let open_chat = match two.drain().as_slice() {
            [ServerPacket::Open(open)] => open.chat.clone(),
            other => panic!("Unexpected packets {:?}", other),
        };
        assert_eq!(open_chat, controller.chat_log().history());

        controller.handle_packet(two.id, ClientPacket::Ready2);
        assert_eq!(roster_ids(&one.drain()), Some(vec![1, 2]));
        assert_eq!(roster_ids(&two.drain()), Some(vec![1, 2]));
    }

    #[test]
    fn test_roster_refresh_targets_prepared_sessions() {
        let mut controller = controller();
        let mut a = join(&mut controller);
        let mut waiting = connect(&mut controller);
        controller.handle_packet(waiting.id, ClientPacket::Ready);
        waiting.drain();

        assert_eq!(controller.broadcast_roster(), 1);
        assert_eq!(roster_ids(&a.drain()), Some(vec![1]));
        assert!(waiting.drain().is_empty());
        assert_eq!(controller.session_count(), 2);
    }
}
