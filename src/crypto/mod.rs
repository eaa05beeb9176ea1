//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - The zeroizing `MasterKey` wrapper (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_master_key, ...};
pub use encryption::{decrypt, encrypt, Sealed};
pub use kdf::{derive_master_key, generate_salt, DEFAULT_ITERATIONS};
pub use keys::MasterKey;
