//! The vault lifecycle: bootstrap, initialize, unlock, lock, reset, and
//! write-through CRUD over the decrypted entry collection.
//!
//! All state lives behind one `RwLock`. Mutations take the write lock for
//! their whole duration (including the re-encrypt and store write), reads
//! share the read lock. `initialize` and `unlock` park the engine in the
//! transient `Unlocking` state while the key is derived outside the lock;
//! every other operation issued meanwhile is rejected with `InvalidState`.
//!
//! Every mutation works on a copy of the collection and only swaps it in
//! after the store write succeeded, so memory never diverges from disk.

use std::collections::HashSet;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{decrypt, derive_master_key, encrypt, generate_salt, MasterKey, DEFAULT_ITERATIONS};
use crate::errors::{LockboxError, Result};

use super::entry::{new_id, Entry, EntryPatch, ImportedEntry, NewEntry};
use super::format::{self, Payload, PayloadRef, VaultMetadata, VaultRecord, CURRENT_VERSION};
use super::stats::VaultStats;
use super::storage::KeyValueStore;

/// Default logical key of the single record slot.
pub const DEFAULT_STORAGE_KEY: &str = "vault";

/// Engine parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Store key the vault record lives under.
    pub storage_key: String,
    /// PBKDF2 iterations used when a new vault is initialized.
    pub iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    /// Created, `bootstrap` not yet run.
    Initializing,
    /// No vault record exists.
    Setup,
    /// A record exists, no key in memory.
    Locked,
    /// Key derivation in progress for `initialize` or `unlock`.
    Unlocking,
    /// Key and entries held in memory.
    Unlocked,
}

impl VaultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Setup => "not set up",
            Self::Locked => "locked",
            Self::Unlocking => "unlocking",
            Self::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key, parameters and decrypted entries of an unlocked vault.
struct Session {
    key: MasterKey,
    metadata: VaultMetadata,
    entries: Vec<Entry>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.entries.zeroize();
    }
}

enum State {
    Initializing,
    Setup,
    Locked(VaultMetadata),
    /// Holds what to fall back to if derivation fails: `None` means `Setup`.
    Unlocking(Option<VaultMetadata>),
    Unlocked(Session),
}

impl State {
    fn status(&self) -> VaultStatus {
        match self {
            Self::Initializing => VaultStatus::Initializing,
            Self::Setup => VaultStatus::Setup,
            Self::Locked(_) => VaultStatus::Locked,
            Self::Unlocking(_) => VaultStatus::Unlocking,
            Self::Unlocked(_) => VaultStatus::Unlocked,
        }
    }
}

/// Why an unlock attempt failed. Only `Read` is reported verbatim.
enum UnlockFailure {
    Missing,
    Read(LockboxError),
    Rejected,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    exported_at: String,
    entries: &'a [Entry],
}

/// The vault engine. Share it across threads behind an `Arc`.
pub struct VaultEngine<S: KeyValueStore> {
    store: S,
    config: EngineConfig,
    state: RwLock<State>,
}

impl<S: KeyValueStore> VaultEngine<S> {
    /// Create an engine in the `Initializing` state. Call `bootstrap` next.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            state: RwLock::new(State::Initializing),
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> VaultStatus {
        self.read().status()
    }

    /// Public KDF parameters of the existing vault, if any.
    pub fn metadata(&self) -> Option<VaultMetadata> {
        match &*self.read() {
            State::Locked(m) | State::Unlocking(Some(m)) => Some(m.clone()),
            State::Unlocked(s) => Some(s.metadata.clone()),
            _ => None,
        }
    }

    /// Engine parameters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Read the store and settle into `Setup` or `Locked`.
    ///
    /// A record that fails to decode is reported as `DecodeError` and the
    /// engine moves to `Setup`; the stored bytes are left untouched. A store
    /// read failure leaves the engine in `Initializing` so the call can be
    /// retried.
    pub fn bootstrap(&self) -> Result<VaultStatus> {
        let mut state = self.write();
        if !matches!(*state, State::Initializing) {
            return Err(invalid("bootstrap", &state));
        }

        match self.store.get(&self.config.storage_key)? {
            None => {
                info!("no vault record found");
                *state = State::Setup;
            }
            Some(bytes) => match format::decode(&bytes) {
                Ok(record) => {
                    info!(iterations = record.iterations, "vault record found");
                    *state = State::Locked(record.metadata());
                }
                Err(e) => {
                    warn!(error = %e, "vault record is unreadable");
                    *state = State::Setup;
                    return Err(e);
                }
            },
        }

        Ok(state.status())
    }

    /// Create a new, empty vault protected by `password`.
    ///
    /// Valid only in `Setup`. On any failure the engine returns to `Setup`
    /// and nothing new has been written.
    pub fn initialize(&self, password: &[u8]) -> Result<()> {
        {
            let mut state = self.write();
            if !matches!(*state, State::Setup) {
                return Err(invalid("initialize", &state));
            }
            *state = State::Unlocking(None);
        }

        let outcome = self.create_session(password);

        let mut state = self.write();
        match outcome {
            Ok(session) => {
                info!(iterations = session.metadata.iterations, "vault initialized");
                *state = State::Unlocked(session);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "vault initialization failed");
                *state = State::Setup;
                Err(LockboxError::InitializationFailure(e.to_string()))
            }
        }
    }

    /// Unlock the vault with `password`.
    ///
    /// Valid only in `Locked`. A wrong password and a damaged record both
    /// fail with `AuthenticationFailure` and leave the engine `Locked`.
    pub fn unlock(&self, password: &[u8]) -> Result<()> {
        let fallback = {
            let mut state = self.write();
            let metadata = match &*state {
                State::Locked(m) => m.clone(),
                other => return Err(invalid("unlock", other)),
            };
            *state = State::Unlocking(Some(metadata.clone()));
            metadata
        };

        let outcome = self.open_session(password);

        let mut state = self.write();
        match outcome {
            Ok(session) => {
                info!(entries = session.entries.len(), "vault unlocked");
                *state = State::Unlocked(session);
                Ok(())
            }
            Err(UnlockFailure::Rejected) => {
                warn!("unlock rejected");
                *state = State::Locked(fallback);
                Err(LockboxError::AuthenticationFailure)
            }
            Err(UnlockFailure::Read(e)) => {
                warn!(error = %e, "unlock failed to read the store");
                *state = State::Locked(fallback);
                Err(e)
            }
            Err(UnlockFailure::Missing) => {
                warn!("vault record disappeared before unlock");
                *state = State::Setup;
                Err(LockboxError::Storage("no vault record found".into()))
            }
        }
    }

    /// Drop the key and entries from memory. No disk I/O.
    pub fn lock(&self) -> Result<()> {
        let mut state = self.write();
        let metadata = match &*state {
            State::Unlocked(session) => session.metadata.clone(),
            other => return Err(invalid("lock", other)),
        };
        // Replacing the state drops the session, which zeroizes it.
        *state = State::Locked(metadata);
        info!("vault locked");
        Ok(())
    }

    /// Destroy the stored record and everything in memory.
    ///
    /// Valid from every settled state. If the store delete fails the
    /// engine keeps its current state.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.write();
        if matches!(*state, State::Initializing | State::Unlocking(_)) {
            return Err(invalid("reset", &state));
        }

        self.store
            .delete(&self.config.storage_key)
            .map_err(|e| LockboxError::PersistFailure(e.to_string()))?;

        *state = State::Setup;
        info!("vault reset");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Add a new entry and persist. Returns the stored entry.
    pub fn add_entry(&self, fields: NewEntry) -> Result<Entry> {
        self.with_session_mut("add entries", |engine, session| {
            let mut entry = Entry::create(fields, Utc::now())?;
            while session.entries.iter().any(|e| e.id == entry.id) {
                entry.id = new_id();
            }

            let mut next = Zeroizing::new(session.entries.clone());
            next.push(entry.clone());
            engine.commit(session, next)?;

            debug!(id = %entry.id, "entry added");
            Ok(entry)
        })
    }

    /// Merge `patch` over the entry with `id` and persist.
    pub fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<Entry> {
        self.with_session_mut("update entries", |engine, session| {
            let mut next = Zeroizing::new(session.entries.clone());
            let entry = next
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| LockboxError::NotFound(id.to_string()))?;
            entry.apply(patch, Utc::now())?;
            let updated = entry.clone();

            engine.commit(session, next)?;
            debug!(id, "entry updated");
            Ok(updated)
        })
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    ///
    /// Deleting an unknown id succeeds without writing to the store.
    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        self.with_session_mut("delete entries", |engine, session| {
            if !session.entries.iter().any(|e| e.id == id) {
                debug!(id, "delete of unknown entry ignored");
                return Ok(false);
            }

            let mut next = Zeroizing::new(session.entries.clone());
            next.retain(|e| e.id != id);
            engine.commit(session, next)?;

            debug!(id, "entry deleted");
            Ok(true)
        })
    }

    /// Replace the whole collection with `imported` and persist.
    ///
    /// Missing ids are generated; an id repeated within the import gets a
    /// fresh id for every occurrence after the first.
    pub fn import_entries(&self, imported: Vec<ImportedEntry>) -> Result<usize> {
        self.with_session_mut("import entries", |engine, session| {
            let now = Utc::now();
            let mut seen = HashSet::with_capacity(imported.len());
            let mut next = Zeroizing::new(Vec::with_capacity(imported.len()));

            for item in &imported {
                let mut entry = Entry::from_import(item, now)?;
                while !seen.insert(entry.id.clone()) {
                    entry.id = new_id();
                }
                next.push(entry);
            }

            let count = next.len();
            engine.commit(session, next)?;
            info!(entries = count, "entries imported");
            Ok(count)
        })
    }

    /// Plaintext JSON `{ exportedAt, entries }` of the current collection.
    ///
    /// The bytes are unencrypted; they are zeroized when dropped.
    pub fn export_entries(&self) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = self.with_session("export entries", |session| {
            let doc = ExportDocument {
                exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                entries: &session.entries,
            };
            serde_json::to_vec_pretty(&doc)
        })?;

        bytes
            .map(Zeroizing::new)
            .map_err(|e| LockboxError::SerializationError(format!("export: {e}")))
    }

    /// Totals, per-tag counts and weak-password count.
    pub fn compute_stats(&self) -> Result<VaultStats> {
        self.with_session("compute stats", |session| VaultStats::compute(&session.entries))
    }

    /// A copy of every entry, in stored order. The copies wipe themselves
    /// when dropped.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        self.with_session("list entries", |session| session.entries.clone())
    }

    /// A copy of the entry with `id`.
    pub fn get_entry(&self, id: &str) -> Result<Entry> {
        self.with_session("read entries", |session| {
            session.entries.iter().find(|e| e.id == id).cloned()
        })?
        .ok_or_else(|| LockboxError::NotFound(id.to_string()))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_session<T>(&self, operation: &'static str, f: impl FnOnce(&Session) -> T) -> Result<T> {
        match &*self.read() {
            State::Unlocked(session) => Ok(f(session)),
            other => Err(invalid(operation, other)),
        }
    }

    fn with_session_mut<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Self, &mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.write();
        match &mut *state {
            State::Unlocked(session) => f(self, session),
            other => Err(invalid(operation, other)),
        }
    }

    /// Persist `next`, then swap it in. The old collection is zeroized.
    fn commit(&self, session: &mut Session, mut next: Zeroizing<Vec<Entry>>) -> Result<()> {
        self.persist(session, &next)?;
        std::mem::swap(&mut session.entries, &mut *next);
        Ok(())
    }

    /// Encrypt `entries` under the session key with a fresh nonce and
    /// overwrite the record slot.
    fn persist(&self, session: &Session, entries: &[Entry]) -> Result<()> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&PayloadRef { entries })
                .map_err(|e| LockboxError::PersistFailure(format!("payload: {e}")))?,
        );

        let sealed = encrypt(&session.key, &plaintext)
            .map_err(|e| LockboxError::PersistFailure(e.to_string()))?;

        let record = VaultRecord {
            version: CURRENT_VERSION,
            iterations: session.metadata.iterations,
            salt: session.metadata.salt.clone(),
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce.to_vec(),
            last_updated: Utc::now().timestamp_millis(),
        };
        let bytes = format::encode(&record)
            .map_err(|e| LockboxError::PersistFailure(e.to_string()))?;

        self.store
            .set(&self.config.storage_key, &bytes)
            .map_err(|e| LockboxError::PersistFailure(e.to_string()))?;

        debug!(entries = entries.len(), "vault persisted");
        Ok(())
    }

    fn create_session(&self, password: &[u8]) -> Result<Session> {
        let metadata = VaultMetadata {
            salt: generate_salt().to_vec(),
            iterations: self.config.iterations,
        };
        let key = derive_master_key(password, &metadata.salt, metadata.iterations)?;
        let session = Session {
            key,
            metadata,
            entries: Vec::new(),
        };

        self.persist(&session, &session.entries)?;
        Ok(session)
    }

    fn open_session(&self, password: &[u8]) -> std::result::Result<Session, UnlockFailure> {
        let bytes = self
            .store
            .get(&self.config.storage_key)
            .map_err(UnlockFailure::Read)?
            .ok_or(UnlockFailure::Missing)?;

        let record = format::decode(&bytes).map_err(|_| UnlockFailure::Rejected)?;
        let key = derive_master_key(password, &record.salt, record.iterations)
            .map_err(|_| UnlockFailure::Rejected)?;

        let plaintext = Zeroizing::new(
            decrypt(&key, &record.ciphertext, &record.nonce).map_err(|_| UnlockFailure::Rejected)?,
        );
        let payload: Payload =
            serde_json::from_slice(&plaintext).map_err(|_| UnlockFailure::Rejected)?;

        Ok(Session {
            key,
            metadata: record.metadata(),
            entries: payload.entries,
        })
    }
}

fn invalid(operation: &'static str, state: &State) -> LockboxError {
    LockboxError::InvalidState {
        operation,
        state: state.status().as_str(),
    }
}
