//! Local filesystem backend.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{check_name, Storage, StorageError, StorageResult, CONFIG_BLOB_NAME};

/// Stores collections as directories under a root path.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    config_dir: PathBuf,
}

impl LocalStorage {
    /// Create a backend rooted at `root`. The config blob lives in `root` too.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.clone(),
            root,
        }
    }

    /// Keep the configuration blob in a different directory.
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    fn collection_dir(&self, collection: &str) -> StorageResult<PathBuf> {
        if collection.is_empty() {
            return Ok(self.root.clone());
        }
        check_name(collection)?;
        Ok(self.root.join(collection))
    }

    fn read(path: &Path, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound {
                    collection: collection.to_string(),
                    name: name.to_string(),
                }
            } else {
                StorageError::Io {
                    operation: format!("read {}", path.display()),
                    source: e,
                }
            }
        })
    }

    /// Write through a temp file in the same directory, then rename over `name`.
    fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> StorageResult<()> {
        fs::create_dir_all(dir).map_err(|e| StorageError::Io {
            operation: format!("create {}", dir.display()),
            source: e,
        })?;

        let target = dir.join(name);
        let io_err = |e: std::io::Error| StorageError::Io {
            operation: format!("write {}", target.display()),
            source: e,
        };

        // Dropped on any early return, which removes the partial file
        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        temp.write_all(bytes).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&target).map_err(|e| io_err(e.error))?;

        log::trace!("[local] wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

impl Storage for LocalStorage {
    fn get_bytes(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        check_name(name)?;
        let path = self.collection_dir(collection)?.join(name);
        Self::read(&path, collection, name)
    }

    fn put_bytes(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()> {
        check_name(name)?;
        let dir = self.collection_dir(collection)?;
        Self::write_atomic(&dir, name, bytes)
    }

    fn scan_all(&self, collection: &str) -> StorageResult<Vec<String>> {
        let dir = self.collection_dir(collection)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("[local] {} does not exist yet", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StorageError::Io {
                    operation: format!("list {}", dir.display()),
                    source: e,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io {
                operation: format!("list {}", dir.display()),
                source: e,
            })?;
            match entry.file_type() {
                Ok(t) if t.is_file() => {}
                _ => continue,
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => log::debug!("[local] skip non UTF-8 name {:?}", raw),
            }
        }
        names.sort();
        Ok(names)
    }

    fn save_config(&self, data: &[u8]) -> StorageResult<()> {
        Self::write_atomic(&self.config_dir, CONFIG_BLOB_NAME, data)
    }

    fn load_config(&self) -> StorageResult<Vec<u8>> {
        let path = self.config_dir.join(CONFIG_BLOB_NAME);
        Self::read(&path, "", CONFIG_BLOB_NAME)
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}
