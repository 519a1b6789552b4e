//! The image store: public save / lookup / sampling operations.
//!
//! # Save pipeline
//!
//! 1. decode the raw bytes (any supported format)
//! 2. compute the 64-bit perceptual fingerprint
//! 3. look for a stored duplicate, exactly (`force`) or within a Hamming
//!    distance threshold
//! 4. on a miss, canonicalize to WebP, persist as `<identifier>.webp` and add
//!    the identifier to the index
//!
//! Every failure is reported as a [`SaveStatus`]; nothing panics on bad input
//! and nothing is retried.
//!
//! Steps 3 and 4 run under a store-wide lock unless serialized saves are
//! disabled. Without it, two concurrent saves of near-identical images can
//! both miss and both be stored.
//!
//! Steps 3 and 4 also hold the shared side of an index gate whose exclusive
//! side [`ImageStore::rebuild_index`] takes across its scan and swap, so a
//! rebuild never discards an identifier added while storage was being listed.
//!
//! # Example
//!
//! ```no_run
//! use phashstore::storage::LocalStorage;
//! use phashstore::store::ImageStore;
//!
//! let store = ImageStore::new(LocalStorage::new("/var/lib/images"), "img");
//! store.rebuild_index().unwrap();
//!
//! let bytes = std::fs::read("cat.jpg").unwrap();
//! let outcome = store.save_image_bytes(&bytes, false, 5);
//! println!("{}", serde_json::to_string(&outcome).unwrap());
//! ```

use std::io::Read;
use std::sync::{Mutex, PoisonError, RwLock};

use crate::config::StoreConfig;
use crate::error::{SaveOutcome, StoreError, StoreResult};
use crate::fingerprint::Identifier;
use crate::imaging::{self, ImageHasher, PerceptualHasher};
use crate::index::DedupIndex;
use crate::matcher::{MatchMode, Matcher};
use crate::sampler::Sampler;
use crate::storage::{identifier_from_name, Storage, StorageResult, IMAGE_EXTENSION};

/// Perceptual-dedup image store over a [`Storage`] backend.
pub struct ImageStore<S: Storage> {
    storage: S,
    collection: String,
    index: DedupIndex,
    matcher: Matcher,
    sampler: Sampler,
    hasher: Box<dyn ImageHasher>,
    save_lock: Option<Mutex<()>>,
    index_gate: RwLock<()>,
}

impl<S: Storage> std::fmt::Debug for ImageStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("storage", &self.storage.kind())
            .field("collection", &self.collection)
            .field("indexed", &self.index.len())
            .field("matcher", &self.matcher)
            .field("sampler", self.sampler.config())
            .field("serialize_saves", &self.save_lock.is_some())
            .finish()
    }
}

impl<S: Storage> ImageStore<S> {
    /// Create a store with an empty index and default settings.
    ///
    /// Call [`ImageStore::rebuild_index`] to load what is already stored.
    pub fn new(storage: S, collection: impl Into<String>) -> Self {
        Self {
            storage,
            collection: collection.into(),
            index: DedupIndex::new(),
            matcher: Matcher::new(),
            sampler: Sampler::default(),
            hasher: Box::new(PerceptualHasher::default()),
            save_lock: Some(Mutex::new(())),
            index_gate: RwLock::new(()),
        }
    }

    /// Create a store from configuration and rebuild its index.
    pub fn open(storage: S, config: &StoreConfig) -> StoreResult<Self> {
        let store = Self::new(storage, config.collection.clone())
            .with_hasher(PerceptualHasher::new(config.algorithm))
            .with_matcher(Matcher::new().with_parallel_scan_min(config.matcher.parallel_scan_min))
            .with_sampler(Sampler::new(config.sampler))
            .with_serialized_saves(config.serialize_saves);
        store.rebuild_index()?;
        Ok(store)
    }

    /// Replace the fingerprint function.
    #[must_use]
    pub fn with_hasher(mut self, hasher: impl ImageHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Replace the matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Enable or disable the save-serializing lock.
    #[must_use]
    pub fn with_serialized_saves(mut self, enabled: bool) -> Self {
        self.save_lock = enabled.then(|| Mutex::new(()));
        self
    }

    /// Save raw image bytes unless a duplicate is stored.
    ///
    /// With `force` only an identical fingerprint counts as a duplicate;
    /// otherwise any stored fingerprint within `threshold` bits does.
    pub fn save_image_bytes(&self, raw: &[u8], force: bool, threshold: u32) -> SaveOutcome {
        match self.try_save(raw, MatchMode::from_flags(force, threshold)) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[save] {}", e);
                SaveOutcome::failed(&e)
            }
        }
    }

    /// Read `reader` to the end and save it in similarity mode.
    pub fn save_image<R: Read>(&self, mut reader: R, threshold: u32) -> SaveOutcome {
        let mut raw = Vec::new();
        if let Err(e) = reader.read_to_end(&mut raw) {
            let err = StoreError::Read(e);
            log::error!("[save] {}", err);
            return SaveOutcome::failed(&err);
        }
        self.save_image_bytes(&raw, false, threshold)
    }

    fn try_save(&self, raw: &[u8], mode: MatchMode) -> StoreResult<SaveOutcome> {
        let decoded = imaging::decode(raw)?;
        let fingerprint = self.hasher.fingerprint(&decoded.image)?;

        let _gate = self.index_gate.read().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .save_lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));

        if let Some(existing) = self.matcher.find_match(&self.index, fingerprint, mode) {
            log::debug!("[save] old {}", existing);
            return Ok(SaveOutcome::exists(existing));
        }

        let id = fingerprint.to_identifier();
        let bytes = imaging::canonical_bytes(&decoded, raw)?;
        self.storage
            .put_bytes(&self.collection, &id.file_name(IMAGE_EXTENSION), &bytes)?;
        if !self.index.insert(&id)? {
            log::debug!("[save] {} was indexed concurrently", id);
        }

        log::debug!("[save] new {} ({} bytes)", id, bytes.len());
        Ok(SaveOutcome::success(id))
    }

    /// Whether `id` is stored.
    pub fn exists_by_identifier(&self, id: &str) -> StoreResult<bool> {
        Ok(self.index.exists(id)?)
    }

    /// Clear the index and reload it from storage.
    ///
    /// Returns the number of indexed identifiers. Repeated calls yield the
    /// same index for unchanged storage. Saves wait until the rebuild is done.
    pub fn rebuild_index(&self) -> StoreResult<usize> {
        let _gate = self.index_gate.write().unwrap_or_else(PoisonError::into_inner);
        let names = self.storage.scan_all(&self.collection)?;
        let total = names.len();
        let count = self
            .index
            .rebuild(names.iter().filter_map(|name| identifier_from_name(name)));
        log::info!(
            "[rebuild] indexed {} of {} entries in {} collection {:?}",
            count,
            total,
            self.storage.kind(),
            self.collection
        );
        Ok(count)
    }

    /// Random stored identifier not in `exclude`.
    pub fn pick_random(&self, exclude: &[Identifier]) -> Option<Identifier> {
        self.sampler.pick(&self.index, exclude)
    }

    /// Stored WebP bytes of `id`.
    pub fn get_image_bytes(&self, id: &Identifier) -> StoreResult<Vec<u8>> {
        Ok(self
            .storage
            .get_bytes(&self.collection, &id.file_name(IMAGE_EXTENSION))?)
    }

    /// Persist the opaque configuration blob.
    pub fn save_config(&self, data: &[u8]) -> StorageResult<()> {
        self.storage.save_config(data)
    }

    /// Load the opaque configuration blob.
    pub fn load_config(&self) -> StorageResult<Vec<u8>> {
        self.storage.load_config()
    }

    /// The dedup index.
    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Collection images are stored in.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of indexed images.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no image is indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
