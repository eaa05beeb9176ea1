//! Durable byte stores the vault record is persisted to.
//!
//! The engine only needs `get`/`set`/`delete` on a single fixed key, so
//! any backend that can hold a blob per key can carry a vault.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::errors::{LockboxError, Result};

/// A synchronous key-value byte store.
///
/// Implementations must make `set` atomic from the caller's point of view:
/// after a failed `set` the previous value must still be readable.
pub trait KeyValueStore: Send + Sync {
    /// Read the value at `key`, or `None` if nothing is stored there.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value at `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove the value at `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Stores each key as `<dir>/<key>.vault`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the vault files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.vault"))
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty()
            || !key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(LockboxError::Storage(format!(
                "invalid storage key '{key}' — only ASCII letters, digits, underscores and hyphens are allowed"
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Self::validate_key(key)?;
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LockboxError::Storage(format!("read failed: {e}"))),
        }
    }

    /// Write atomically: write a temp file in the same directory, then
    /// rename it over the target so readers never see a half-written file.
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        Self::validate_key(key)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| LockboxError::Storage(format!("cannot create vault directory: {e}")))?;

        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{key}.vault.tmp"));

        fs::write(&tmp_path, value)
            .map_err(|e| LockboxError::Storage(format!("write failed: {e}")))?;

        // On Unix, restrict permissions to owner-only read/write.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp_path, perms)
                .map_err(|e| LockboxError::Storage(format!("failed to set permissions: {e}")))?;
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(LockboxError::Storage(format!("rename failed: {e}")));
        }

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockboxError::Storage(format!("delete failed: {e}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store, useful for tests and for embedding.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> LockboxError {
        LockboxError::Storage("memory store lock poisoned".into())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self.values.read().map_err(|_| Self::poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        values.remove(key);
        Ok(())
    }
}
