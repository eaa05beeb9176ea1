//! Vault module — the encrypted credential store.
//!
//! This module provides:
//! - `Entry` and its input types (`entry`)
//! - The JSON vault record codec (`format`)
//! - Durable key-value stores (`storage`)
//! - The lock/unlock state machine and CRUD engine (`engine`)
//! - Read-only aggregate stats (`stats`)

pub mod engine;
pub mod entry;
pub mod format;
pub mod stats;
pub mod storage;

// Re-export the most commonly used items.
pub use engine::{EngineConfig, VaultEngine, VaultStatus};
pub use entry::{Entry, EntryPatch, ImportedEntry, NewEntry};
pub use format::{VaultMetadata, VaultRecord};
pub use stats::VaultStats;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
