//! Error taxonomy, save statuses and exit codes.

use serde::Serialize;
use thiserror::Error;

use crate::fingerprint::{CodecError, Identifier};
use crate::imaging::ImagingError;
use crate::index::IndexError;
use crate::storage::StorageError;

/// Errors surfaced by [`crate::store::ImageStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Decoding, hashing or encoding failed.
    #[error(transparent)]
    Imaging(#[from] ImagingError),

    /// A storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An identifier did not decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An identifier was too short for the index.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Reading the input stream failed.
    #[error("failed to read image input: {0}")]
    Read(#[source] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome tag of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveStatus {
    /// Input could not be decoded.
    #[serde(rename = "notanimg")]
    NotAnImage,
    /// Fingerprint computation failed.
    #[serde(rename = "dherr")]
    HashError,
    /// Storage read or write failed.
    #[serde(rename = "ioerr")]
    IoError,
    /// WebP encoding failed.
    #[serde(rename = "encerr")]
    EncodeError,
    /// A duplicate is already stored.
    #[serde(rename = "exist")]
    Exists,
    /// The image was stored under a new identifier.
    #[serde(rename = "success")]
    Success,
}

impl SaveStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAnImage => "notanimg",
            Self::HashError => "dherr",
            Self::IoError => "ioerr",
            Self::EncodeError => "encerr",
            Self::Exists => "exist",
            Self::Success => "success",
        }
    }

    /// Returns true for [`SaveStatus::Exists`] and [`SaveStatus::Success`].
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Exists | Self::Success)
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&StoreError> for SaveStatus {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Imaging(ImagingError::NotAnImage(_)) => Self::NotAnImage,
            StoreError::Imaging(ImagingError::Hash(_))
            | StoreError::Codec(_)
            | StoreError::Index(_) => Self::HashError,
            StoreError::Imaging(ImagingError::Encode(_)) => Self::EncodeError,
            StoreError::Storage(_) | StoreError::Read(_) => Self::IoError,
        }
    }
}

/// Result of a save request: status plus the identifier when one applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    /// Outcome tag
    #[serde(rename = "stat")]
    pub status: SaveStatus,
    /// Stored or matched identifier
    #[serde(rename = "img", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
}

impl SaveOutcome {
    /// A duplicate of `identifier` already exists.
    #[must_use]
    pub fn exists(identifier: Identifier) -> Self {
        Self {
            status: SaveStatus::Exists,
            identifier: Some(identifier),
        }
    }

    /// The image was stored as `identifier`.
    #[must_use]
    pub fn success(identifier: Identifier) -> Self {
        Self {
            status: SaveStatus::Success,
            identifier: Some(identifier),
        }
    }

    /// A failed save.
    #[must_use]
    pub fn failed(err: &StoreError) -> Self {
        Self {
            status: SaveStatus::from(err),
            identifier: None,
        }
    }
}

/// Exit codes for the command-line front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Not found: the requested image or sample does not exist.
    NotFound = 2,
    /// Rejected: the save request returned a failure status.
    Rejected = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PS000",
            Self::GeneralError => "PS001",
            Self::NotFound => "PS002",
            Self::Rejected => "PS003",
        }
    }
}
