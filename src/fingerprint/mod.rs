//! Perceptual fingerprints and their printable identifiers.
//!
//! A [`Fingerprint`] is the 64-bit perceptual hash of an image. Its
//! [`Identifier`] is a fixed-width, filename-safe string produced by the
//! base16384 [`codec`], and doubles as the stored file stem.
//!
//! # Example
//!
//! ```
//! use phashstore::fingerprint::{Fingerprint, Identifier};
//!
//! let fp = Fingerprint::new(0xDEAD_BEEF);
//! let id = fp.to_identifier();
//! assert_eq!(Identifier::parse(id.as_str()).unwrap().decode().unwrap(), fp);
//! ```

pub mod codec;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use codec::{CodecError, IDENTIFIER_LEN};

/// Number of leading characters used as the index bucket key.
pub const PREFIX_LEN: usize = 3;

/// A 64-bit perceptual hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wrap a raw hash value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Build a fingerprint from 8 big-endian bytes.
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// The raw hash value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Hamming distance: number of differing bits.
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Decode from an identifier string.
    pub fn from_identifier(identifier: &str) -> Result<Self, CodecError> {
        codec::decode(identifier).map(Self)
    }

    /// Encode into the printable identifier.
    #[must_use]
    pub fn to_identifier(self) -> Identifier {
        Identifier(codec::encode(self.0))
    }
}

impl From<u64> for Fingerprint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Fixed-width printable encoding of a [`Fingerprint`].
///
/// Identifiers read back from storage are not re-validated, so an
/// `Identifier` may hold a string that does not decode. [`Identifier::parse`]
/// is the validating constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Parse and validate an identifier string.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        codec::decode(s)?;
        Ok(Self(s.to_string()))
    }

    /// Wrap a stored name without validating it.
    #[must_use]
    pub fn from_stored(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Decode back into the fingerprint.
    pub fn decode(&self) -> Result<Fingerprint, CodecError> {
        codec::decode(&self.0).map(Fingerprint)
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stored file name for this identifier with the given extension.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Fingerprint> for Identifier {
    fn from(fp: Fingerprint) -> Self {
        fp.to_identifier()
    }
}

/// Hamming distance between the fingerprints behind two identifier strings.
pub fn hamming_distance(a: &str, b: &str) -> Result<u32, CodecError> {
    let a = Fingerprint::from_identifier(a)?;
    let b = Fingerprint::from_identifier(b)?;
    Ok(a.distance(b))
}

/// Split an identifier into its bucket prefix and suffix on character boundaries.
///
/// Returns `None` when the string is shorter than [`PREFIX_LEN`] characters.
#[must_use]
pub fn split_prefix(id: &str) -> Option<(&str, &str)> {
    let mut chars = id.char_indices();
    let boundary = match chars.nth(PREFIX_LEN) {
        Some((idx, _)) => idx,
        None if id.chars().count() == PREFIX_LEN => id.len(),
        None => return None,
    };
    Some(id.split_at(boundary))
}
