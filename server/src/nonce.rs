//! Move key generation

use rand::rngs::OsRng;
use rand::RngCore;
use worldsync_shared::MoveKey;

const KEY_BYTES: usize = 16;

/// Draws a fresh 128-bit key from the operating system CSPRNG, hex encoded.
pub fn generate_move_key() -> MoveKey {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);

    MoveKey::new(hex::encode(bytes))
}
