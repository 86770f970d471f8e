//! Persisted key/value storage
//!
//! Values are raw bytes; the file store keeps them as UTF-8 strings in a
//! single JSON object and rewrites it atomically on flush.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::StoreError;

/// Key/value storage for settings
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str);

    /// Persist pending changes
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// JSON-file backed store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty; it is overwritten on next flush.
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    warn!(?path, ?e, "settings file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no settings file yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(?path, ?e, "failed to read settings file, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path: path.to_owned(),
            values,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.values.get(key).map(|value| value.as_bytes().to_vec())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let value = String::from_utf8(value.to_vec()).map_err(|_| StoreError::NotUtf8 {
            key: key.to_string(),
        })?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.values)?;
        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, bytes).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, "settings written");
        Ok(())
    }
}

/// In-memory store for tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub values: std::collections::HashMap<String, Vec<u8>>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = FileStore::open(&path);
        assert!(store.get("toggleLanguage1").is_none());

        store.set("toggleLanguage1", b"com.apple.keylayout.US").unwrap();
        store.set("toggleLanguage2", b"com.apple.keylayout.Russian").unwrap();
        store.remove("toggleLanguage2");
        store.flush().unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(
            reopened.get("toggleLanguage1").as_deref(),
            Some(b"com.apple.keylayout.US".as_slice())
        );
        assert!(reopened.get("toggleLanguage2").is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = FileStore::open(&path);
        assert!(store.get("toggleHotkey").is_none());
    }

    #[test]
    fn test_file_store_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(&dir.path().join("settings.json"));
        let err = store.set("toggleHotkey", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, StoreError::NotUtf8 { .. }));
    }
}
