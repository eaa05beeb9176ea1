//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce. The nonce
//! is returned separately; the vault record stores it in its own field (`iv`).

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use super::keys::MasterKey;
use crate::errors::{LockboxError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Output of a single `encrypt` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Ciphertext with the 16-byte auth tag appended.
    pub ciphertext: Vec<u8>,
    /// The nonce used for this ciphertext, never reused under the same key.
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LockboxError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| LockboxError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);

    Ok(Sealed {
        ciphertext,
        nonce: nonce_bytes,
    })
}

/// Decrypt data produced by `encrypt`.
///
/// Returns the exact original plaintext or `AuthenticationFailure`. A wrong
/// key, a flipped bit and a malformed nonce all map to that same error.
pub fn decrypt(key: &MasterKey, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN || ciphertext.len() < TAG_LEN {
        return Err(LockboxError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| LockboxError::AuthenticationFailure)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| LockboxError::AuthenticationFailure)
}
