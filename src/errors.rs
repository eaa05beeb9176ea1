use thiserror::Error;

/// All errors that can occur in Lockbox.
#[derive(Debug, Error)]
pub enum LockboxError {
    // --- State machine errors ---
    #[error("Cannot {operation} while the vault is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    // --- Crypto errors ---
    /// Wrong password, tampered record, or corrupted ciphertext.
    /// The message is deliberately the same for every cause.
    #[error("Invalid master password")]
    AuthenticationFailure,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Invalid vault record: {0}")]
    DecodeError(String),

    #[error("Entry '{0}' not found")]
    NotFound(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Failed to save vault: {0}")]
    PersistFailure(String),

    #[error("Failed to create vault: {0}")]
    InitializationFailure(String),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Master password is too weak: {0}")]
    WeakPassword(String),
}

/// Convenience type alias for Lockbox results.
pub type Result<T> = std::result::Result<T, LockboxError>;
