//! Duplicate detection against the dedup index.
//!
//! Two modes are supported:
//!
//! * [`MatchMode::Exact`] re-encodes the candidate and does a bucket lookup.
//!   Only a byte-identical fingerprint matches.
//! * [`MatchMode::Similar`] walks every stored identifier in insertion order
//!   and returns the first whose Hamming distance to the candidate is within
//!   the threshold. The first inserted match wins, not the closest one.

use rayon::prelude::*;

use crate::fingerprint::{Fingerprint, Identifier};
use crate::index::DedupIndex;

/// Index size from which the similarity scan runs in parallel.
pub const DEFAULT_PARALLEL_SCAN_MIN: usize = 4096;

/// How a candidate fingerprint is compared against stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Exact fingerprint equality ("force" mode).
    Exact,
    /// Hamming distance at most `threshold`.
    Similar {
        /// Maximum number of differing bits still treated as the same image
        threshold: u32,
    },
}

impl MatchMode {
    /// Map the public `force` / `threshold` flags to a mode.
    #[must_use]
    pub fn from_flags(force: bool, threshold: u32) -> Self {
        if force {
            Self::Exact
        } else {
            Self::Similar { threshold }
        }
    }
}

/// Finds stored near-duplicates of a fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    parallel_scan_min: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            parallel_scan_min: DEFAULT_PARALLEL_SCAN_MIN,
        }
    }
}

impl Matcher {
    /// Create a matcher with the default parallel threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index size from which the scan uses rayon.
    #[must_use]
    pub fn with_parallel_scan_min(mut self, min: usize) -> Self {
        self.parallel_scan_min = min.max(1);
        self
    }

    /// Look for a stored duplicate of `fingerprint`.
    ///
    /// Returns `None` when nothing matches; that is not an error.
    #[must_use]
    pub fn find_match(
        &self,
        index: &DedupIndex,
        fingerprint: Fingerprint,
        mode: MatchMode,
    ) -> Option<Identifier> {
        match mode {
            MatchMode::Exact => {
                let id = fingerprint.to_identifier();
                // Encoded identifiers always have five characters
                match index.exists(id.as_str()) {
                    Ok(true) => {
                        log::debug!("[match] exact hit {}", id);
                        Some(id)
                    }
                    Ok(false) => None,
                    Err(e) => {
                        log::warn!("[match] exact lookup failed: {}", e);
                        None
                    }
                }
            }
            MatchMode::Similar { threshold } => index.with_identifiers(|ids| {
                let hit = if ids.len() >= self.parallel_scan_min {
                    ids.par_iter()
                        .find_first(|id| within(id, fingerprint, threshold))
                } else {
                    ids.iter().find(|id| within(id, fingerprint, threshold))
                };
                if let Some(id) = hit {
                    log::debug!("[match] similar hit {} for {}", id, fingerprint);
                }
                hit.cloned()
            }),
        }
    }
}

fn within(id: &Identifier, fingerprint: Fingerprint, threshold: u32) -> bool {
    match id.decode() {
        Ok(stored) => stored.distance(fingerprint) <= threshold,
        Err(e) => {
            log::debug!("[match] skip {}: {}", id, e);
            false
        }
    }
}
