//! Vault record wire format.
//!
//! The whole vault is one JSON object stored under a single key:
//!
//! ```text
//! {
//!   "version": 1,
//!   "iterations": 310000,
//!   "salt": "<base64>",
//!   "data": "<base64 ciphertext + GCM tag>",
//!   "iv": "<base64 12-byte nonce>",
//!   "lastUpdated": 1700000000000
//! }
//! ```
//!
//! - **version**: format tag, only `1` is understood.
//! - **iterations** / **salt**: public PBKDF2 parameters (`VaultMetadata`).
//! - **data** / **iv**: AES-256-GCM output over the JSON payload
//!   `{ "entries": [...] }`.
//! - **lastUpdated**: milliseconds since the Unix epoch of the last write.

use serde::{Deserialize, Serialize};

use super::entry::{Entry, ImportedEntry};
use crate::errors::{LockboxError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current record format version.
pub const CURRENT_VERSION: u32 = 1;

/// Minimum accepted salt length (128 bits).
const MIN_SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The non-secret parameters needed to re-derive the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultMetadata {
    pub salt: Vec<u8>,
    pub iterations: u32,
}

/// The full durable unit written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub version: u32,
    pub iterations: u32,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Ciphertext with appended auth tag.
    #[serde(
        rename = "data",
        alias = "ciphertext",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub ciphertext: Vec<u8>,

    #[serde(
        rename = "iv",
        alias = "nonce",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub nonce: Vec<u8>,

    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
}

impl VaultRecord {
    /// The public KDF parameters carried by this record.
    pub fn metadata(&self) -> VaultMetadata {
        VaultMetadata {
            salt: self.salt.clone(),
            iterations: self.iterations,
        }
    }
}

/// The plaintext that gets encrypted into `VaultRecord::ciphertext`.
#[derive(Serialize, Deserialize)]
pub(crate) struct Payload {
    pub entries: Vec<Entry>,
}

/// Borrowing twin of `Payload` so serializing never copies the entries.
#[derive(Serialize)]
pub(crate) struct PayloadRef<'a> {
    pub entries: &'a [Entry],
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize a record to the bytes handed to the store.
pub fn encode(record: &VaultRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| LockboxError::SerializationError(format!("vault record: {e}")))
}

/// Parse and validate a record read from the store.
///
/// Malformed JSON, missing fields, unknown versions and impossible
/// parameters all produce `DecodeError`.
pub fn decode(bytes: &[u8]) -> Result<VaultRecord> {
    let record: VaultRecord = serde_json::from_slice(bytes)
        .map_err(|e| LockboxError::DecodeError(format!("record JSON: {e}")))?;

    if record.version != CURRENT_VERSION {
        return Err(LockboxError::DecodeError(format!(
            "unsupported version {}, expected {CURRENT_VERSION}",
            record.version
        )));
    }
    if record.iterations < 1 {
        return Err(LockboxError::DecodeError(
            "iterations must be at least 1".into(),
        ));
    }
    if record.salt.len() < MIN_SALT_LEN {
        return Err(LockboxError::DecodeError(format!(
            "salt must be at least {MIN_SALT_LEN} bytes, got {}",
            record.salt.len()
        )));
    }

    Ok(record)
}

/// Parse an import file: either an export document `{ "entries": [...] }`
/// or a bare JSON array of entries.
pub fn parse_import(bytes: &[u8]) -> Result<Vec<ImportedEntry>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ImportFile {
        Document { entries: Vec<ImportedEntry> },
        List(Vec<ImportedEntry>),
    }

    let file: ImportFile = serde_json::from_slice(bytes)
        .map_err(|e| LockboxError::SerializationError(format!("import file: {e}")))?;

    Ok(match file {
        ImportFile::Document { entries } | ImportFile::List(entries) => entries,
    })
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
