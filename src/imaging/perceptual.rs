//! Perceptual image hashing for similarity detection.
//!
//! This module provides the `PerceptualHasher` which computes 64-bit
//! fingerprints that remain stable under re-encoding, mild resizing and
//! compression. Hashing itself is done by `image_hasher`.
//!
//! # Compatibility with existing stores
//!
//! Identifiers written by other dHash implementations (for example Go's
//! `goimagehash` `DifferenceHash`) still decode, index and pick normally, but
//! their bits are not laid out like `image_hasher`'s `Gradient` output: the
//! resize filter, grayscale conversion and bit order all differ. A new upload
//! of an image stored by such a tool will usually not fall within the
//! similarity threshold of the old identifier, so it is stored again under a
//! new one. Exact-mode (`force`) saves never match across the two either.

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use super::ImagingError;
use crate::fingerprint::Fingerprint;

/// Hash grid edge; 8x8 gives 64 bits.
const HASH_EDGE: u32 = 8;

/// Turns decoded pixels into a [`Fingerprint`].
pub trait ImageHasher: Send + Sync {
    /// Compute the fingerprint of `image`.
    fn fingerprint(&self, image: &DynamicImage) -> Result<Fingerprint, ImagingError>;
}

/// Supported perceptual hashing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// dHash (Difference Hash) - Gradient-based, very fast and effective.
    #[default]
    Dhash,
    /// pHash (Perceptual Hash) - DCT-based, most resilient to transformations.
    Phash,
    /// aHash (Average Hash) - Mean-based, fast but less resilient.
    Ahash,
}

impl PerceptualAlgorithm {
    /// Suggested similarity threshold (Hamming distance) for this algorithm.
    pub fn default_threshold(&self) -> u32 {
        match self {
            Self::Dhash => 5,
            Self::Phash => 10,
            Self::Ahash => 5,
        }
    }
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dhash => write!(f, "dHash"),
            Self::Phash => write!(f, "pHash"),
            Self::Ahash => write!(f, "aHash"),
        }
    }
}

/// Computes perceptual fingerprints with `image_hasher`.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
    algorithm: PerceptualAlgorithm,
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher` with the given algorithm.
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        let mut config = HasherConfig::new().hash_size(HASH_EDGE, HASH_EDGE);

        match algorithm {
            PerceptualAlgorithm::Dhash => {
                config = config.hash_alg(HashAlg::Gradient);
            }
            PerceptualAlgorithm::Phash => {
                config = config.hash_alg(HashAlg::Median).preproc_dct();
            }
            PerceptualAlgorithm::Ahash => {
                config = config.hash_alg(HashAlg::Mean);
            }
        }

        Self {
            hasher: config.to_hasher(),
            algorithm,
        }
    }

    /// Get the algorithm used by this hasher.
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(PerceptualAlgorithm::Dhash)
    }
}

impl std::fmt::Debug for PerceptualHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptualHasher")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl ImageHasher for PerceptualHasher {
    fn fingerprint(&self, image: &DynamicImage) -> Result<Fingerprint, ImagingError> {
        let hash = self.hasher.hash_image(image);
        let bytes: [u8; 8] = hash.as_bytes().try_into().map_err(|_| {
            ImagingError::Hash(format!(
                "{} produced {} bytes, expected 8",
                self.algorithm,
                hash.as_bytes().len()
            ))
        })?;
        Ok(Fingerprint::from_be_bytes(bytes))
    }
}
