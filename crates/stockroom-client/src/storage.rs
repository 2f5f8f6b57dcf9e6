//! # Local Storage
//!
//! A small key/value store that survives restarts. It holds boot hints only:
//! the theme, the refresh token and the last signed-in user.
//!
//! ## Keys
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────────────┐
//! │ darkMode     │ "true" | "false"                                         │
//! │ refreshToken │ opaque token, removed on logout                          │
//! │ user         │ JSON SessionUser, removed on logout                      │
//! └──────────────┴──────────────────────────────────────────────────────────┘
//! ```
//!
//! The file backend writes the whole map as JSON to a temp file and renames
//! it over the old one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use stockroom_core::SessionUser;

use crate::error::{ClientError, ClientResult};

pub const DARK_MODE_KEY: &str = "darkMode";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

// =============================================================================
// Memory Backend
// =============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File Backend
// =============================================================================

pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens the state file, starting empty if it does not exist.
    ///
    /// A file that cannot be parsed is logged and treated as empty; it is
    /// overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!(?path, error = %e, "Unreadable state file, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            debug!(?path, "No state file yet");
            BTreeMap::new()
        };
        Ok(FileStorage {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// Boot Hints
// =============================================================================

/// What the dashboard knows at start-up, before anyone signs in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootHints {
    pub dark_mode: bool,
    pub has_refresh_token: bool,
    pub last_user: Option<SessionUser>,
}

impl BootHints {
    pub fn read(storage: &dyn LocalStorage) -> ClientResult<Self> {
        let dark_mode = storage
            .get(DARK_MODE_KEY)?
            .map(|v| v == "true")
            .unwrap_or(false);
        let has_refresh_token = storage
            .get(REFRESH_TOKEN_KEY)?
            .map(|t| !t.is_empty())
            .unwrap_or(false);
        let last_user = match storage.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable persisted user");
                    None
                }
            },
            None => None,
        };
        Ok(BootHints {
            dark_mode,
            has_refresh_token,
            last_user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set(DARK_MODE_KEY, "true").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "refresh-1").unwrap();
        storage.remove(REFRESH_TOKEN_KEY).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(DARK_MODE_KEY).unwrap().as_deref(), Some("true"));
        assert_eq!(reopened.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        storage.set(USER_KEY, "{}").unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("user"));
    }

    #[test]
    fn test_boot_hints() {
        let storage = MemoryStorage::new();
        assert_eq!(BootHints::read(&storage).unwrap(), BootHints::default());

        storage.set(DARK_MODE_KEY, "true").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "refresh-1").unwrap();
        storage
            .set(
                USER_KEY,
                r#"{"firstName":"Ada","lastName":"Lovelace","email":"ada@acme.test","role":"manager"}"#,
            )
            .unwrap();

        let hints = BootHints::read(&storage).unwrap();
        assert!(hints.dark_mode);
        assert!(hints.has_refresh_token);
        assert_eq!(hints.last_user.unwrap().email, "ada@acme.test");
    }
}
