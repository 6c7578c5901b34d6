//! Broadcast fan-out to prepared sessions

use crate::registry::SessionRegistry;
use log::debug;
use worldsync_shared::{ServerPacket, SessionId};

/// Delivers `build(recipient)` to every prepared session not in `excluded`.
///
/// The payload is built per recipient because several packets address the
/// recipient by id or carry content meant for it alone. Delivery is
/// fire-and-forget: each recipient has its own bounded queue, so a stalled
/// client only loses its own packets. Returns the number of packets queued.
pub fn broadcast<F>(registry: &SessionRegistry, excluded: &[SessionId], mut build: F) -> usize
where
    F: FnMut(SessionId) -> ServerPacket,
{
    let mut delivered = 0;
    for (id, session) in registry.snapshot() {
        if !session.is_prepared() || excluded.contains(&id) {
            continue;
        }
        if session.send(build(id)) {
            delivered += 1;
        } else {
            debug!("[session #{}] missed a broadcast", id);
        }
    }
    delivered
}
