//! Storage backends for persisted images.
//!
//! The store only talks to persistence through the [`Storage`] trait. Three
//! backends implement it:
//!
//! * [`LocalStorage`]: collections are directories under a root path
//! * [`RemoteStorage`]: collections are folders on an HTTP object store
//! * [`MemoryStorage`]: in-process maps, for tests and embedding
//!
//! Stored images are named `<identifier>.webp`. Names that do not have a
//! five-character stem and the `.webp` extension are ignored when the index
//! is rebuilt (see [`identifier_from_name`]).

pub mod local;
pub mod memory;
pub mod remote;

use std::sync::Arc;

use thiserror::Error;

use crate::fingerprint::{Identifier, IDENTIFIER_LEN};

pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use remote::{RemoteConfig, RemoteStorage};

/// Extension of persisted images.
pub const IMAGE_EXTENSION: &str = "webp";

/// Name of the opaque configuration blob.
pub const CONFIG_BLOB_NAME: &str = "conf.pb";

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("{collection}/{name} not found")]
    NotFound {
        /// Collection that was searched
        collection: String,
        /// Object name
        name: String,
    },

    /// Local I/O failed.
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// What was being done
        operation: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request itself failed (connect, timeout, body).
    #[error("request failed during {operation}: {source}")]
    Http {
        /// What was being done
        operation: String,
        /// The underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The remote store answered with a non-success status.
    #[error("remote store returned {status} during {operation}")]
    Status {
        /// What was being done
        operation: String,
        /// HTTP status code
        status: u16,
    },

    /// A listing response could not be parsed.
    #[error("invalid listing for {collection}: {source}")]
    InvalidListing {
        /// Collection that was listed
        collection: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// A collection or object name would escape the storage root.
    #[error("invalid object name: {0:?}")]
    InvalidName(String),
}

impl StorageError {
    /// Returns true for [`StorageError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence operations the image store depends on.
pub trait Storage: Send + Sync {
    /// Read the bytes of `name` in `collection`.
    fn get_bytes(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>>;

    /// Write `bytes` as `name` in `collection`.
    ///
    /// A failed write must not leave a partially written `name` visible to
    /// [`Storage::scan_all`].
    fn put_bytes(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()>;

    /// List object names in `collection`.
    fn scan_all(&self, collection: &str) -> StorageResult<Vec<String>>;

    /// Persist the opaque configuration blob.
    fn save_config(&self, data: &[u8]) -> StorageResult<()>;

    /// Load the opaque configuration blob.
    fn load_config(&self) -> StorageResult<Vec<u8>>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get_bytes(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        (**self).get_bytes(collection, name)
    }

    fn put_bytes(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()> {
        (**self).put_bytes(collection, name, bytes)
    }

    fn scan_all(&self, collection: &str) -> StorageResult<Vec<String>> {
        (**self).scan_all(collection)
    }

    fn save_config(&self, data: &[u8]) -> StorageResult<()> {
        (**self).save_config(data)
    }

    fn load_config(&self) -> StorageResult<Vec<u8>> {
        (**self).load_config()
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_bytes(&self, collection: &str, name: &str) -> StorageResult<Vec<u8>> {
        (**self).get_bytes(collection, name)
    }

    fn put_bytes(&self, collection: &str, name: &str, bytes: &[u8]) -> StorageResult<()> {
        (**self).put_bytes(collection, name, bytes)
    }

    fn scan_all(&self, collection: &str) -> StorageResult<Vec<String>> {
        (**self).scan_all(collection)
    }

    fn save_config(&self, data: &[u8]) -> StorageResult<()> {
        (**self).save_config(data)
    }

    fn load_config(&self) -> StorageResult<Vec<u8>> {
        (**self).load_config()
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}

/// Extract the identifier from a stored file name.
///
/// Returns `None` unless the name is a five-character stem followed by
/// `.webp`. The stem is not decoded here.
#[must_use]
pub fn identifier_from_name(name: &str) -> Option<Identifier> {
    let stem = name
        .strip_suffix(IMAGE_EXTENSION)?
        .strip_suffix('.')?;
    (stem.chars().count() == IDENTIFIER_LEN).then(|| Identifier::from_stored(stem))
}

/// Reject names that are empty or could address something outside a collection.
pub(crate) fn check_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
