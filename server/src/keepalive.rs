//! Per-session liveness challenge
//!
//! Each connection task owns a ticker; every tick is forwarded to the hub,
//! which calls [`challenge`] on the session. The ticker lives and dies with
//! the connection task, so a closed session is never ticked again.

use crate::session::{CloseReason, Session};
use log::debug;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use worldsync_shared::{server_time, PingPayload};

/// Ticker firing every `period`, first after one full period has elapsed.
pub fn ticker(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Runs one keepalive tick for a session.
///
/// A session still in the handshake has run out of time to log in; a session
/// that never answered the previous ping has timed out. Otherwise a new ping
/// is marked outstanding and returned for delivery.
pub fn challenge(session: &mut Session) -> Result<PingPayload, CloseReason> {
    if !session.is_prepared() {
        return Err(CloseReason::LoginTimeout);
    }
    if session.pending_ping {
        return Err(CloseReason::Timeout);
    }
    session.pending_ping = true;
    debug!("[session #{}] ping", session.id);
    Ok(PingPayload {
        time: server_time(),
    })
}

/// Clears the outstanding challenge after a pong.
pub fn answer(session: &mut Session) {
    session.pending_ping = false;
}
