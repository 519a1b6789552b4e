//! In-memory backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{check_name, Storage, StorageError, StorageResult, CONFIG_BLOB_NAME};

type Collections = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// Keeps every collection in process memory.
///
/// Writes can be made to fail with [`MemoryStorage::set_fail_writes`] to
/// exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: RwLock<Collections>,
    config: RwLock<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `put_bytes` / `save_config` calls fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of objects in `collection`.
    #[must_use]
    pub fn object_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_writable(&self, operation: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                operation: operation.to_string(),
                source: std::io::Error::other("writes disabled"),
            });
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get_bytes(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        check_name(name)?;
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .and_then(|objects| objects.get(name))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                collection: collection.to_string(),
                name: name.to_string(),
            })
    }

    fn put_bytes(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()> {
        check_name(name)?;
        self.check_writable(&format!("put {}/{}", collection, name))?;
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn scan_all(&self, collection: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn save_config(&self, data: &[u8]) -> StorageResult<()> {
        self.check_writable("save config")?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(data.to_vec());
        Ok(())
    }

    fn load_config(&self) -> StorageResult<Vec<u8>> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| StorageError::NotFound {
                collection: String::new(),
                name: CONFIG_BLOB_NAME.to_string(),
            })
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
