use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::FeedError;

/// Ids whose reveal has finished. JSON list of ids.
pub const ANIMATED_KEY: &str = "wall-animated-submissions";
/// Per-field "already played" ledger. JSON map of id -> fields.
pub const PLAYED_KEY: &str = "wall-typing-animations";
/// Session flag: the next feed fetch follows this client's own submission.
pub const USER_SUBMITTED_KEY: &str = "wall-user-submitted";

/// String key/value storage shaped like a browser's local or session storage.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, FeedError>;
    fn set(&self, key: &str, value: &str) -> Result<(), FeedError>;
    fn remove(&self, key: &str) -> Result<(), FeedError>;
}

pub type SharedStorage = Arc<dyn Storage>;

/// Process-lifetime storage. Used for session state and in tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, FeedError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FeedError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FeedError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Storage backed by one JSON object on disk.
///
/// Every operation re-reads the file, so several clients pointed at the
/// same path see each other's writes the way browser tabs share storage.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, FeedError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(FeedError::Storage(format!("read {}: {}", self.path.display(), e))),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), FeedError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| FeedError::Storage(format!("write {}: {}", self.path.display(), e)))
    }

    fn update<F>(&self, f: F) -> Result<(), FeedError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, FeedError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FeedError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), FeedError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_is_shared_between_handles() {
        let dir = std::env::temp_dir().join(format!("wall_storage_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");

        let a = FileStorage::new(&path);
        let b = FileStorage::new(&path);
        assert_eq!(a.get("k").unwrap(), None);

        a.set("k", "1").unwrap();
        b.set("other", "2").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("1"));
        assert_eq!(a.get("other").unwrap().as_deref(), Some("2"));

        b.remove("k").unwrap();
        assert_eq!(a.get("k").unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("wall_storage_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileStorage::new(&path);
        assert!(matches!(store.get("k"), Err(FeedError::Decode(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
