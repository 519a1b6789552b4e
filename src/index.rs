//! In-memory dedup index of stored identifiers.
//!
//! The index keeps two views of the same data:
//!
//! * a bucket map from the 3-character identifier prefix to the 2-character
//!   suffixes stored under it, used for exact existence checks
//! * a flat list of every identifier in insertion order, used by the
//!   similarity scan and the sampler
//!
//! Both views live behind one [`RwLock`], so readers run concurrently and a
//! writer excludes everyone else. The index is rebuilt from storage at
//! startup and grows on every successful save.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::fingerprint::{split_prefix, Identifier, PREFIX_LEN};

/// Errors from index operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Identifier too short to have a bucket prefix.
    #[error("identifier {id:?} is shorter than {PREFIX_LEN} characters")]
    InputTooShort {
        /// The rejected identifier
        id: String,
    },
}

#[derive(Debug, Default)]
struct IndexState {
    buckets: HashMap<String, Vec<String>>,
    all: Vec<Identifier>,
}

impl IndexState {
    fn contains(&self, prefix: &str, suffix: &str) -> bool {
        self.buckets
            .get(prefix)
            .is_some_and(|tails| tails.iter().any(|t| t == suffix))
    }

    fn push(&mut self, prefix: &str, suffix: &str, id: &Identifier) {
        let tails = self.buckets.entry(prefix.to_string()).or_insert_with(|| {
            log::debug!("[index] create bucket {}", prefix);
            Vec::new()
        });
        tails.push(suffix.to_string());
        log::trace!("[index] bucket {} append {}", prefix, suffix);
        self.all.push(id.clone());
    }
}

fn split(id: &str) -> Result<(&str, &str), IndexError> {
    split_prefix(id).ok_or_else(|| IndexError::InputTooShort { id: id.to_string() })
}

/// Shared index of known identifiers.
#[derive(Debug, Default)]
pub struct DedupIndex {
    state: RwLock<IndexState>,
}

impl DedupIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        // Writers only append, so a poisoned state is still consistent.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether `id` is stored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InputTooShort`] if `id` has fewer than three characters.
    pub fn exists(&self, id: &str) -> Result<bool, IndexError> {
        let (prefix, suffix) = split(id)?;
        Ok(self.read().contains(prefix, suffix))
    }

    /// Append `id` without checking for an existing entry.
    ///
    /// Calling this twice with the same identifier records it twice. Use
    /// [`DedupIndex::insert`] unless duplicate bookkeeping is acceptable.
    pub fn add(&self, id: &Identifier) -> Result<(), IndexError> {
        let (prefix, suffix) = split(id.as_str())?;
        self.write().push(prefix, suffix, id);
        Ok(())
    }

    /// Add `id` unless it is already present.
    ///
    /// The check and the append happen under one write lock. Returns `true`
    /// if the identifier was added.
    pub fn insert(&self, id: &Identifier) -> Result<bool, IndexError> {
        let (prefix, suffix) = split(id.as_str())?;
        let mut state = self.write();
        if state.contains(prefix, suffix) {
            return Ok(false);
        }
        state.push(prefix, suffix, id);
        Ok(true)
    }

    /// Snapshot of all identifiers in insertion order.
    #[must_use]
    pub fn enumerate(&self) -> Vec<Identifier> {
        self.read().all.clone()
    }

    /// Run `f` over the identifier list while holding the read lock.
    pub fn with_identifiers<R>(&self, f: impl FnOnce(&[Identifier]) -> R) -> R {
        f(&self.read().all)
    }

    /// Replace the contents with `ids`, skipping duplicates and short names.
    ///
    /// Returns the number of identifiers now in the index.
    pub fn rebuild<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut fresh = IndexState::default();
        for id in ids {
            match split(id.as_str()) {
                Ok((prefix, suffix)) if !fresh.contains(prefix, suffix) => {
                    fresh.push(prefix, suffix, &id);
                }
                Ok(_) => log::debug!("[index] skip duplicate {}", id),
                Err(e) => log::warn!("[index] skip entry: {}", e),
            }
        }
        let count = fresh.all.len();
        *self.write() = fresh;
        count
    }

    /// Remove every entry.
    pub fn clear(&self) {
        *self.write() = IndexState::default();
    }

    /// Number of identifiers in the flat list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().all.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().all.is_empty()
    }
}
