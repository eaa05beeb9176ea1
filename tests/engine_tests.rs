//! Integration tests for the vault engine: lifecycle, persistence,
//! rollback and concurrency.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lockbox::errors::{LockboxError, Result};
use lockbox::vault::engine::DEFAULT_STORAGE_KEY;
use lockbox::vault::format;
use lockbox::vault::{
    EngineConfig, EntryPatch, FileStore, ImportedEntry, KeyValueStore, MemoryStore, NewEntry,
    VaultEngine, VaultStatus,
};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"Correct-Horse-Battery-9!";

fn config() -> EngineConfig {
    EngineConfig {
        iterations: 1_000,
        ..EngineConfig::default()
    }
}

fn new_engine<S: KeyValueStore>(store: S) -> VaultEngine<S> {
    let engine = VaultEngine::new(store, config());
    engine.bootstrap().expect("bootstrap");
    engine
}

fn unlocked<S: KeyValueStore>(store: S) -> VaultEngine<S> {
    let engine = new_engine(store);
    engine.initialize(PASSWORD).expect("initialize");
    engine
}

fn entry(title: &str, password: &str, tags: &[&str]) -> NewEntry {
    NewEntry {
        title: title.into(),
        username: format!("{}@example.com", title.to_lowercase()),
        password: password.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..NewEntry::default()
    }
}

/// Store whose writes can be made to fail on demand.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn fail(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LockboxError::Storage("disk full".into()));
        }
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LockboxError::Storage("read-only".into()));
        }
        self.inner.delete(key)
    }
}

/// Store that, once armed, parks the next `get` or `set` until the test
/// releases it.
struct GatedStore {
    inner: MemoryStore,
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl GatedStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn pause_if_armed(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
    }
}

impl KeyValueStore for GatedStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.pause_if_armed();
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.pause_if_armed();
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)
    }
}

fn assert_invalid_state<T: std::fmt::Debug>(result: Result<T>) {
    assert!(
        matches!(result, Err(LockboxError::InvalidState { .. })),
        "expected InvalidState, got {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_on_disk() {
    let dir = TempDir::new().unwrap();

    let first = unlocked(FileStore::new(dir.path()));
    let added = first.add_entry(entry("Mail", "x", &["work", "mail"])).unwrap();
    assert_eq!(first.compute_stats().unwrap().total, 1);
    drop(first);

    // A fresh process sees a locked vault and the same entry after unlock.
    let second = new_engine(FileStore::new(dir.path()));
    assert_eq!(second.status(), VaultStatus::Locked);
    second.unlock(PASSWORD).unwrap();
    assert_eq!(second.entries().unwrap(), vec![added]);

    let stats = second.compute_stats().unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.weak, 1);
    assert_eq!(stats.tags.get("work"), Some(&1));
    assert_eq!(stats.tags.get("mail"), Some(&1));
}

#[test]
fn several_entries_survive_lock_and_reopen_in_order() {
    let store = MemoryStore::new();
    let engine = unlocked(store.clone());

    engine
        .add_entry(NewEntry {
            url: Some("https://mail.example.com".into()),
            notes: Some("recovery codes in the safe".into()),
            ..entry("Mail", "Mail-Pass-0001!", &["work", "mail"])
        })
        .unwrap();
    let bank = engine.add_entry(entry("Bank", "short", &[])).unwrap();
    let gone = engine.add_entry(entry("Scratch", "x", &["tmp"])).unwrap();
    engine
        .add_entry(NewEntry {
            url: Some("https://git.example.com".into()),
            ..entry("Git", "Git-Pass-0002!", &["work"])
        })
        .unwrap();

    engine
        .update_entry(
            &bank.id,
            &EntryPatch {
                password: Some("Bank-Pass-0003!".into()),
                notes: Some("branch: main street".into()),
                tags: Some(vec!["money".into()]),
                ..EntryPatch::default()
            },
        )
        .unwrap();
    assert!(engine.delete_entry(&gone.id).unwrap());

    let before = engine.entries().unwrap();
    assert_eq!(
        before.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
        vec!["Mail", "Bank", "Git"]
    );
    engine.lock().unwrap();
    drop(engine);

    let reopened = new_engine(store);
    reopened.unlock(PASSWORD).unwrap();
    assert_eq!(reopened.entries().unwrap(), before);
}

#[test]
fn record_on_disk_has_public_parameters_only() {
    let store = MemoryStore::new();
    let engine = unlocked(store.clone());
    engine
        .add_entry(entry("Bank", "Very-Secret-Value-42", &[]))
        .unwrap();

    let bytes = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(!text.contains("Very-Secret-Value-42"));
    assert!(!text.contains("Bank"));

    let record = format::decode(&bytes).unwrap();
    assert_eq!(record.version, 1);
    assert_eq!(record.iterations, 1_000);
    assert_eq!(record.nonce.len(), 12);
    assert!(record.last_updated > 0);
    assert_eq!(Some(record.metadata()), engine.metadata());
}

#[test]
fn every_write_uses_a_fresh_nonce() {
    let store = MemoryStore::new();
    let engine = unlocked(store.clone());
    let before = format::decode(&store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap()).unwrap();
    engine.add_entry(entry("A", "x", &[])).unwrap();
    let after = format::decode(&store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap()).unwrap();

    assert_ne!(before.nonce, after.nonce);
    assert_eq!(before.salt, after.salt);
}

#[test]
fn wrong_password_gives_generic_error() {
    let store = MemoryStore::new();
    unlocked(store.clone()).lock().unwrap();

    let engine = new_engine(store);
    let err = engine.unlock(b"not the password").unwrap_err();
    assert!(matches!(err, LockboxError::AuthenticationFailure));
    assert_eq!(engine.status(), VaultStatus::Locked);

    // The right password still works afterwards.
    engine.unlock(PASSWORD).unwrap();
    assert_eq!(engine.status(), VaultStatus::Unlocked);
}

#[test]
fn tampered_record_looks_like_wrong_password() {
    for field in ["data", "iv"] {
        let store = MemoryStore::new();
        unlocked(store.clone())
            .add_entry(entry("A", "x", &[]))
            .unwrap();

        let mut record =
            format::decode(&store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap()).unwrap();
        match field {
            "data" => record.ciphertext[3] ^= 0x01,
            _ => record.nonce[0] ^= 0x01,
        }
        store
            .set(DEFAULT_STORAGE_KEY, &format::encode(&record).unwrap())
            .unwrap();

        let engine = new_engine(store);
        assert!(
            matches!(engine.unlock(PASSWORD), Err(LockboxError::AuthenticationFailure)),
            "tampered {field} must be rejected"
        );
        assert_eq!(engine.status(), VaultStatus::Locked);
    }
}

#[test]
fn corrupt_record_fails_bootstrap_with_decode_error() {
    let store = MemoryStore::new();
    store.set(DEFAULT_STORAGE_KEY, b"{\"version\":1}").unwrap();

    let engine = VaultEngine::new(store.clone(), config());
    assert!(matches!(engine.bootstrap(), Err(LockboxError::DecodeError(_))));
    assert_eq!(engine.status(), VaultStatus::Setup);

    // Initializing replaces the unreadable record.
    engine.initialize(PASSWORD).unwrap();
    assert!(format::decode(&store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap()).is_ok());
}

#[test]
fn operations_require_unlocked_state() {
    let engine = new_engine(MemoryStore::new());
    assert!(matches!(
        engine.add_entry(entry("A", "x", &[])),
        Err(LockboxError::InvalidState { .. })
    ));
    assert!(matches!(
        engine.export_entries(),
        Err(LockboxError::InvalidState { .. })
    ));
    assert!(matches!(
        engine.unlock(PASSWORD),
        Err(LockboxError::InvalidState { .. })
    ));
}

#[test]
fn operations_are_rejected_while_unlock_is_in_flight() {
    let memory = MemoryStore::new();
    unlocked(memory.clone())
        .add_entry(entry("Mail", "x", &["work"]))
        .unwrap();

    let store = Arc::new(GatedStore::new(memory));
    let engine = Arc::new(new_engine(Arc::clone(&store)));
    assert_eq!(engine.status(), VaultStatus::Locked);

    store.arm();
    let unlocking = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.unlock(PASSWORD))
    };
    store.entered.wait();

    // The state lock is free while the unlock is parked in the store.
    assert_eq!(engine.status(), VaultStatus::Unlocking);
    assert!(engine.metadata().is_some());
    assert_invalid_state(engine.reset());
    assert_invalid_state(engine.add_entry(entry("Other", "y", &[])));
    assert_invalid_state(engine.entries());
    assert_invalid_state(engine.lock());
    assert_invalid_state(engine.unlock(PASSWORD));

    store.release.wait();
    unlocking.join().unwrap().unwrap();
    assert_eq!(engine.status(), VaultStatus::Unlocked);
    assert_eq!(engine.entries().unwrap().len(), 1);
}

#[test]
fn operations_are_rejected_while_initialize_is_in_flight() {
    let store = Arc::new(GatedStore::new(MemoryStore::new()));
    let engine = Arc::new(new_engine(Arc::clone(&store)));

    store.arm();
    let initializing = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.initialize(PASSWORD))
    };
    store.entered.wait();

    assert_eq!(engine.status(), VaultStatus::Unlocking);
    assert!(engine.metadata().is_none());
    assert_invalid_state(engine.reset());
    assert_invalid_state(engine.initialize(PASSWORD));
    assert_invalid_state(engine.compute_stats());

    store.release.wait();
    initializing.join().unwrap().unwrap();
    assert_eq!(engine.status(), VaultStatus::Unlocked);
}

#[test]
fn operations_are_rejected_before_bootstrap() {
    let engine = VaultEngine::new(MemoryStore::new(), config());
    assert_eq!(engine.status(), VaultStatus::Initializing);
    assert_invalid_state(engine.initialize(PASSWORD));
    assert_invalid_state(engine.unlock(PASSWORD));
    assert_invalid_state(engine.reset());
    assert_invalid_state(engine.add_entry(entry("A", "x", &[])));
    assert_invalid_state(engine.export_entries());
}

#[test]
fn reset_from_locked_deletes_everything() {
    let store = MemoryStore::new();
    unlocked(store.clone()).lock().unwrap();

    let engine = new_engine(store.clone());
    engine.reset().unwrap();
    assert_eq!(engine.status(), VaultStatus::Setup);
    assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), None);

    // A new vault can be created with a different password.
    engine.initialize(b"Another-Password-77!").unwrap();
    assert!(engine.entries().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[test]
fn update_merges_fields_and_keeps_id() {
    let engine = unlocked(MemoryStore::new());
    let added = engine
        .add_entry(NewEntry {
            url: Some("https://mail.example.com".into()),
            notes: Some("old".into()),
            ..entry("Mail", "x", &["work"])
        })
        .unwrap();

    let updated = engine
        .update_entry(
            &added.id,
            &EntryPatch {
                password: Some("N3w-Password-Value!".into()),
                notes: Some(String::new()),
                tags: Some(vec!["personal".into()]),
                ..EntryPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.id, added.id);
    assert_eq!(updated.title, "Mail");
    assert_eq!(updated.url.as_deref(), Some("https://mail.example.com"));
    assert_eq!(updated.notes, None);
    assert_eq!(updated.tags, vec!["personal"]);
    assert_eq!(updated.created_at, added.created_at);
    assert!(updated.updated_at >= added.updated_at);
    assert_eq!(engine.get_entry(&added.id).unwrap(), updated);
}

#[test]
fn invalid_patch_changes_nothing() {
    let engine = unlocked(MemoryStore::new());
    let added = engine.add_entry(entry("Mail", "x", &[])).unwrap();

    let result = engine.update_entry(
        &added.id,
        &EntryPatch {
            title: Some("   ".into()),
            password: Some("changed".into()),
            ..EntryPatch::default()
        },
    );
    assert!(matches!(result, Err(LockboxError::InvalidEntry(_))));
    assert_eq!(engine.get_entry(&added.id).unwrap(), added);
}

#[test]
fn delete_removes_entry() {
    let engine = unlocked(MemoryStore::new());
    let a = engine.add_entry(entry("A", "x", &[])).unwrap();
    let b = engine.add_entry(entry("B", "y", &[])).unwrap();

    assert!(engine.delete_entry(&a.id).unwrap());
    assert_eq!(engine.entries().unwrap(), vec![b]);
    assert!(matches!(
        engine.get_entry(&a.id),
        Err(LockboxError::NotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Rollback on persist failure
// ---------------------------------------------------------------------------

#[test]
fn failed_write_leaves_memory_and_disk_unchanged() {
    let store = Arc::new(FlakyStore::default());
    let engine = unlocked(Arc::clone(&store));
    let kept = engine.add_entry(entry("Kept", "x", &[])).unwrap();
    let on_disk = store.get(DEFAULT_STORAGE_KEY).unwrap();

    store.fail(true);

    assert!(matches!(
        engine.add_entry(entry("Lost", "y", &[])),
        Err(LockboxError::PersistFailure(_))
    ));
    assert!(matches!(
        engine.update_entry(
            &kept.id,
            &EntryPatch {
                title: Some("Renamed".into()),
                ..EntryPatch::default()
            }
        ),
        Err(LockboxError::PersistFailure(_))
    ));
    assert!(matches!(
        engine.delete_entry(&kept.id),
        Err(LockboxError::PersistFailure(_))
    ));
    assert!(matches!(
        engine.import_entries(Vec::new()),
        Err(LockboxError::PersistFailure(_))
    ));

    assert_eq!(engine.entries().unwrap(), vec![kept.clone()]);
    assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), on_disk);
    assert_eq!(engine.status(), VaultStatus::Unlocked);

    // Reset keeps the current state when the delete fails.
    assert!(matches!(engine.reset(), Err(LockboxError::PersistFailure(_))));
    assert_eq!(engine.status(), VaultStatus::Unlocked);

    store.fail(false);
    engine.add_entry(entry("Later", "z", &[])).unwrap();
    assert_eq!(engine.entries().unwrap().len(), 2);
}

#[test]
fn failed_initialize_returns_to_setup() {
    let store = Arc::new(FlakyStore::default());
    store.fail(true);
    let engine = new_engine(Arc::clone(&store));

    assert!(matches!(
        engine.initialize(PASSWORD),
        Err(LockboxError::InitializationFailure(_))
    ));
    assert_eq!(engine.status(), VaultStatus::Setup);
    assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), None);

    store.fail(false);
    engine.initialize(PASSWORD).unwrap();
    assert_eq!(engine.status(), VaultStatus::Unlocked);
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[test]
fn export_is_plaintext_document_of_entries() {
    let engine = unlocked(MemoryStore::new());
    engine.add_entry(entry("A", "pw-a", &["x"])).unwrap();
    engine.add_entry(entry("B", "pw-b", &[])).unwrap();

    let bytes = engine.export_entries().unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let exported_at = doc["exportedAt"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(exported_at).is_ok());
    assert!(exported_at.ends_with('Z'));
    assert!(doc.get("data").is_none());
    assert!(doc.get("iv").is_none());

    let entries = doc["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["title"], "A");
    assert_eq!(entries[0]["password"], "pw-a");
    assert_eq!(entries[1]["title"], "B");
}

#[test]
fn import_replaces_collection() {
    let source = unlocked(MemoryStore::new());
    let a = source.add_entry(entry("A", "x", &["t"])).unwrap();
    let b = source.add_entry(entry("B", "y", &[])).unwrap();
    let exported = source.export_entries().unwrap();

    let target = unlocked(MemoryStore::new());
    target.add_entry(entry("Old", "z", &[])).unwrap();

    let imported = format::parse_import(&exported).unwrap();
    assert_eq!(target.import_entries(imported).unwrap(), 2);

    let entries = target.entries().unwrap();
    assert_eq!(entries.len(), 2);
    for (got, want) in entries.iter().zip([&a, &b]) {
        assert_eq!(got.id, want.id);
        assert_eq!(got.title, want.title);
        assert_eq!(got.password, want.password);
        assert_eq!(got.tags, want.tags);
        assert_eq!(got.created_at, want.created_at);
        assert!(got.updated_at >= got.created_at);
    }
    assert!(entries.iter().all(|e| e.title != "Old"));
}

#[test]
fn import_fills_in_missing_ids() {
    let engine = unlocked(MemoryStore::new());
    let imported: Vec<ImportedEntry> =
        serde_json::from_str(r#"[{"title":"A","username":"u"},{"title":"B","username":"v"}]"#)
            .unwrap();

    assert_eq!(engine.import_entries(imported).unwrap(), 2);
    let entries = engine.entries().unwrap();
    assert!(entries.iter().all(|e| !e.id.is_empty()));
    assert_ne!(entries[0].id, entries[1].id);
}

#[test]
fn import_with_invalid_entry_changes_nothing() {
    let engine = unlocked(MemoryStore::new());
    let kept = engine.add_entry(entry("Kept", "x", &[])).unwrap();
    let imported: Vec<ImportedEntry> =
        serde_json::from_str(r#"[{"title":"","username":"u"}]"#).unwrap();

    assert!(engine.import_entries(imported).is_err());
    assert_eq!(engine.entries().unwrap(), vec![kept]);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_adds_are_all_persisted() {
    let store = MemoryStore::new();
    let engine = Arc::new(unlocked(store.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for j in 0..5 {
                    engine
                        .add_entry(entry(&format!("T{i}-{j}"), "x", &[]))
                        .unwrap();
                    engine.compute_stats().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(engine.entries().unwrap().len(), 40);

    // The last write on disk holds every entry.
    engine.lock().unwrap();
    let reopened = new_engine(store);
    reopened.unlock(PASSWORD).unwrap();
    assert_eq!(reopened.entries().unwrap().len(), 40);
}
