//! Move validation
//!
//! Checks run in order:
//! - session must be prepared, otherwise the move is dropped silently
//! - an outstanding move key must be echoed exactly
//! - every coordinate and angle must be finite
//! - the move may not cover more than the configured distance

use crate::session::{CloseReason, Session};
use thiserror::Error;
use worldsync_shared::MoveRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    /// Session has not finished the handshake; the move is ignored.
    #[error("session is not prepared")]
    NotPrepared,
    /// Key absent or different from the one last issued.
    #[error("unauthorized move packet")]
    Unauthorized,
    /// Implausible position or orientation.
    #[error("illegal move packet")]
    Illegal,
}

impl MoveRejection {
    /// Close reason for rejections that end the session, `None` for silent drops.
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            MoveRejection::NotPrepared => None,
            MoveRejection::Unauthorized => Some(CloseReason::UnauthorizedMove),
            MoveRejection::Illegal => Some(CloseReason::IllegalMove),
        }
    }
}

/// Validates a proposed move against the session's committed state.
///
/// Pure: the session is not modified.
pub fn validate_move(
    session: &Session,
    request: &MoveRequest,
    max_distance: f64,
) -> Result<(), MoveRejection> {
    if !session.is_prepared() {
        return Err(MoveRejection::NotPrepared);
    }

    if let Some(expected) = &session.move_key {
        if request.key.as_ref() != Some(expected) {
            return Err(MoveRejection::Unauthorized);
        }
    }

    let angles_finite =
        request.yaw.is_finite() && request.pitch.is_finite() && request.head_yaw.is_finite();
    if !request.position.is_finite() || !angles_finite {
        return Err(MoveRejection::Illegal);
    }

    if session.position.distance(&request.position) > max_distance {
        return Err(MoveRejection::Illegal);
    }

    Ok(())
}
