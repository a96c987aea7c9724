//! Durable storage for the refresh token.
//!
//! The refresh token is the only credential that survives a restart; the
//! access token never touches this store.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data directory available")]
    NoDataDir,
}

/// Durable storage capability for the refresh token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, TokenStoreError>;
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

impl<S: TokenStore + ?Sized> TokenStore for Arc<S> {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        (**self).clear()
    }
}

/// File-backed store under the platform data dir
/// (e.g. `~/.local/share/authkit/refresh-token` on Linux).
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store at the default platform location.
    pub fn default_location() -> Result<Self, TokenStoreError> {
        let dir = dirs::data_dir().ok_or(TokenStoreError::NoDataDir)?;
        Ok(Self {
            path: dir.join("authkit").join("refresh-token"),
        })
    }

    /// Store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::at(dir.path().join("nested").join("refresh-token"));

        assert!(store.load().expect("load").is_none());

        store.save("refresh-1").expect("save");
        assert_eq!(Some("refresh-1".to_string()), store.load().expect("load"));

        store.save("refresh-2").expect("save");
        assert_eq!(Some("refresh-2".to_string()), store.load().expect("load"));

        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());

        // Clearing an already-empty store is fine.
        store.clear().expect("clear");
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryTokenStore::new();
        assert!(store.load().expect("load").is_none());
        store.save("refresh-1").expect("save");
        assert_eq!(Some("refresh-1".to_string()), store.load().expect("load"));
        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());
    }
}
