//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is stored next to the salt in every vault record,
//! so a vault always re-derives its key with the parameters it was
//! created with, even if the configured default changes later.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use super::keys::{MasterKey, KEY_LEN};
use crate::errors::{LockboxError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Default PBKDF2 iteration count for new vaults.
pub const DEFAULT_ITERATIONS: u32 = 310_000;

/// Derive a 256-bit master key from a password, salt and iteration count.
///
/// The same inputs always produce the same key. Any password is accepted,
/// including the empty one; strength policy belongs to the caller.
pub fn derive_master_key(password: &[u8], salt: &[u8], iterations: u32) -> Result<MasterKey> {
    if iterations < 1 {
        return Err(LockboxError::KeyDerivationFailed(
            "PBKDF2 iterations must be at least 1".into(),
        ));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);

    Ok(MasterKey::new(key))
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
