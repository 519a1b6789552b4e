//! Random selection of stored identifiers.
//!
//! [`Sampler::pick`] returns a uniformly random identifier that is not in a
//! caller-supplied exclusion list. The strategy depends on how much of the
//! index is excluded:
//!
//! * nothing excluded: one random draw
//! * sparse exclusions (`total / excluded > rejection_ratio`): draw and retry
//!   until a non-excluded identifier comes up, falling back to a linear scan
//!   after `max_rejections` misses
//! * dense exclusions: linear scan in insertion order, first non-excluded wins

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Identifier;
use crate::index::DedupIndex;

/// Tunable parameters for [`Sampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Minimum total-to-excluded ratio (exclusive) for rejection sampling.
    pub rejection_ratio: usize,
    /// Draws before giving up on rejection sampling.
    pub max_rejections: usize,
    /// Fixed RNG seed for reproducible picks.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            rejection_ratio: 10,
            max_rejections: 64,
            seed: None,
        }
    }
}

/// Picks random identifiers from a [`DedupIndex`].
#[derive(Debug)]
pub struct Sampler {
    config: SamplerConfig,
    rng: Mutex<StdRng>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

impl Sampler {
    /// Create a sampler; seeded from `config.seed` when set, otherwise from entropy.
    #[must_use]
    pub fn new(config: SamplerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Create a deterministic sampler with default ratios.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(SamplerConfig {
            seed: Some(seed),
            ..SamplerConfig::default()
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Pick a random identifier from `index` that is not in `exclude`.
    ///
    /// Returns `None` when `exclude` is at least as large as the index.
    pub fn pick(&self, index: &DedupIndex, exclude: &[Identifier]) -> Option<Identifier> {
        index.with_identifiers(|all| self.pick_from(all, exclude))
    }

    /// Same as [`Sampler::pick`] over an explicit slice.
    pub fn pick_from(&self, all: &[Identifier], exclude: &[Identifier]) -> Option<Identifier> {
        let total = all.len();
        let excluded = exclude.len();

        if excluded >= total {
            return None;
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        if excluded == 0 {
            return Some(all[rng.gen_range(0..total)].clone());
        }

        if total / excluded > self.config.rejection_ratio {
            for _ in 0..self.config.max_rejections {
                let candidate = &all[rng.gen_range(0..total)];
                if !exclude.contains(candidate) {
                    return Some(candidate.clone());
                }
            }
            log::debug!(
                "[pick] {} rejections in a row, falling back to scan",
                self.config.max_rejections
            );
        }

        all.iter().find(|id| !exclude.contains(id)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use std::collections::HashMap;

    fn ids(n: u64) -> Vec<Identifier> {
        (0..n).map(|v| Fingerprint::new(v).to_identifier()).collect()
    }

    #[test]
    fn test_empty_index_returns_none() {
        let sampler = Sampler::with_seed(1);
        assert_eq!(sampler.pick_from(&[], &[]), None);
    }

    #[test]
    fn test_full_exclusion_returns_none() {
        let all = ids(5);
        let sampler = Sampler::with_seed(1);
        assert_eq!(sampler.pick_from(&all, &all), None);
    }

    #[test]
    fn test_dense_exclusion_uses_first_remaining() {
        let all = ids(5);
        let sampler = Sampler::with_seed(1);
        // ratio 5/3 = 1, linear scan returns the first non-excluded entry
        let exclude = vec![all[0].clone(), all[1].clone(), all[3].clone()];
        assert_eq!(sampler.pick_from(&all, &exclude), Some(all[2].clone()));
    }

    #[test]
    fn test_sparse_exclusion_never_returns_excluded() {
        let all = ids(100);
        let exclude = vec![all[0].clone(), all[50].clone()];
        let sampler = Sampler::with_seed(7);
        for _ in 0..500 {
            let picked = sampler.pick_from(&all, &exclude).unwrap();
            assert!(!exclude.contains(&picked));
        }
    }

    #[test]
    fn test_rejection_cap_falls_back_to_scan() {
        let all = ids(100);
        let exclude = vec![all[0].clone()];
        let sampler = Sampler::new(SamplerConfig {
            rejection_ratio: 10,
            max_rejections: 0,
            seed: Some(3),
        });
        assert_eq!(sampler.pick_from(&all, &exclude), Some(all[1].clone()));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let all = ids(50);
        let a = Sampler::with_seed(42);
        let b = Sampler::with_seed(42);
        let seq_a: Vec<_> = (0..20).map(|_| a.pick_from(&all, &[])).collect();
        let seq_b: Vec<_> = (0..20).map(|_| b.pick_from(&all, &[])).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_roughly_uniform() {
        let all = ids(4);
        let sampler = Sampler::with_seed(99);
        let mut counts: HashMap<Identifier, usize> = HashMap::new();
        for _ in 0..8000 {
            *counts.entry(sampler.pick_from(&all, &[]).unwrap()).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            // expected 2000 each
            assert!((1700..=2300).contains(count), "count {}", count);
        }
    }

    #[test]
    fn test_pick_through_index() {
        let index = DedupIndex::new();
        for id in ids(3) {
            index.insert(&id).unwrap();
        }
        let sampler = Sampler::with_seed(5);
        let exclude = index.enumerate();
        assert_eq!(sampler.pick(&index, &exclude), None);
        assert!(sampler.pick(&index, &exclude[..2]).is_some());
    }
}
