//! Durable slot for one bearer token.
//!
//! A store is a blind string slot: no validation, no expiry, no parsing.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token storage unavailable: {0}")]
    Unavailable(String),

    #[error("token storage I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Key-value persistence for the bearer token.
///
/// Implementations must be safe to share across threads; the session context
/// holds one behind an `Arc`.
pub trait TokenStore: Send + Sync {
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;

    fn read(&self) -> Result<Option<String>, TokenStoreError>;

    /// Erase the slot. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

impl<S> TokenStore for Arc<S>
where
    S: TokenStore + ?Sized,
{
    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        (**self).save(token)
    }

    fn read(&self) -> Result<Option<String>, TokenStoreError> {
        (**self).read()
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        (**self).clear()
    }
}

/// In-memory store for tests/dev. Contents die with the process.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the slot, as if a previous run had saved `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        let mut slot = self.slot.lock().map_err(|_| poisoned())?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, TokenStoreError> {
        let slot = self.slot.lock().map_err(|_| poisoned())?;
        Ok(slot.clone())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let mut slot = self.slot.lock().map_err(|_| poisoned())?;
        *slot = None;
        Ok(())
    }
}

fn poisoned() -> TokenStoreError {
    TokenStoreError::Unavailable("in-memory slot lock poisoned".to_string())
}

/// File-backed store: one file named after the storage key.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.key)
    }

    fn io_error(path: &Path, source: io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;

        // Write-then-rename: readers never observe a half-written token.
        let path = self.path();
        let tmp = self.dir.join(format!("{}.tmp", self.key));
        std::fs::write(&tmp, token).map_err(|e| Self::io_error(&tmp, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| Self::io_error(&tmp, e))?;
        }

        std::fs::rename(&tmp, &path).map_err(|e| Self::io_error(&path, e))
    }

    fn read(&self) -> Result<Option<String>, TokenStoreError> {
        let path = self.path();
        match std::fs::read_to_string(&path) {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_is_a_blind_slot() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.read().unwrap(), None);

        store.save("not.a.jwt at all").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("not.a.jwt at all"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state");

        let first = FileTokenStore::new(&nested, "token");
        first.save("aaa.bbb.ccc").unwrap();

        let second = FileTokenStore::new(&nested, "token");
        assert_eq!(second.read().unwrap().as_deref(), Some("aaa.bbb.ccc"));
        assert!(!nested.join("token.tmp").exists());
    }

    #[test]
    fn file_store_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileTokenStore::new(dir.path(), "token");
        let b = FileTokenStore::new(dir.path(), "other");

        a.save("one").unwrap();
        assert_eq!(b.read().unwrap(), None);
    }

    #[test]
    fn clearing_a_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("never-created"), "token");
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn unwritable_location_surfaces_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // A regular file where the directory should be.
        let store = FileTokenStore::new(&blocker, "token");
        assert!(matches!(store.save("t"), Err(TokenStoreError::Io { .. })));
    }
}
