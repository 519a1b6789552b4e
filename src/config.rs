//! Store configuration.
//!
//! Settings are layered with figment, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`phashstore.toml` in the platform config directory, or an
//!    explicit path)
//! 3. environment variables prefixed with `PHASHSTORE_`, using `__` for
//!    nested keys (e.g. `PHASHSTORE_REMOTE__URL`)

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::imaging::PerceptualAlgorithm;
use crate::matcher::DEFAULT_PARALLEL_SCAN_MIN;
use crate::sampler::SamplerConfig;
use crate::storage::{LocalStorage, RemoteConfig, RemoteStorage, Storage};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PHASHSTORE_";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "phashstore.toml";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong type.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Writing the config file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serializing to TOML failed.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local directory tree.
    #[default]
    Local,
    /// HTTP object store.
    Remote,
}

/// Settings for the local backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory that holds the collections.
    pub root: PathBuf,
    /// Directory for the config blob; defaults to `root`.
    pub config_dir: Option<PathBuf>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            config_dir: None,
        }
    }
}

/// Settings for the similarity scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Index size from which the scan runs in parallel.
    pub parallel_scan_min: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            parallel_scan_min: DEFAULT_PARALLEL_SCAN_MIN,
        }
    }
}

/// Full store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage backend.
    pub backend: BackendKind,
    /// Collection (directory or remote folder) holding the images.
    pub collection: String,
    /// Default Hamming distance for similarity matching.
    pub threshold: u32,
    /// Run match, persist and index update as one critical section.
    pub serialize_saves: bool,
    /// Perceptual hash algorithm.
    pub algorithm: PerceptualAlgorithm,
    /// Local backend settings.
    pub local: LocalConfig,
    /// Remote backend settings.
    pub remote: RemoteConfig,
    /// Random pick tuning.
    pub sampler: SamplerConfig,
    /// Similarity scan tuning.
    pub matcher: MatcherConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            collection: "img".to_string(),
            threshold: PerceptualAlgorithm::Dhash.default_threshold(),
            serialize_saves: true,
            algorithm: PerceptualAlgorithm::Dhash,
            local: LocalConfig::default(),
            remote: RemoteConfig::default(),
            sampler: SamplerConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load defaults, then `path` (if given and present), then environment.
    pub fn load_from_path(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if path.exists() {
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold > 64 {
            return Err(ConfigError::Invalid {
                field: "threshold",
                reason: format!("{} exceeds the 64 bits of a fingerprint", self.threshold),
            });
        }
        if self.sampler.rejection_ratio == 0 {
            return Err(ConfigError::Invalid {
                field: "sampler.rejection_ratio",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.backend == BackendKind::Remote && self.remote.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "remote.url",
                reason: "required for the remote backend".to_string(),
            });
        }
        Ok(())
    }

    /// Write as TOML to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Platform-specific config file path.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "phashstore", "phashstore")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Build the configured storage backend.
    pub fn build_storage(&self) -> Box<dyn Storage> {
        match self.backend {
            BackendKind::Local => {
                let mut storage = LocalStorage::new(&self.local.root);
                if let Some(dir) = &self.local.config_dir {
                    storage = storage.with_config_dir(dir);
                }
                Box::new(storage)
            }
            BackendKind::Remote => Box::new(RemoteStorage::new(&self.remote)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collection, "img");
        assert_eq!(config.threshold, 5);
        assert!(config.serialize_saves);
        assert_eq!(config.sampler.rejection_ratio, 10);
    }

    #[test]
    fn test_validate_threshold() {
        let config = StoreConfig {
            threshold: 65,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_remote_requires_url() {
        let config = StoreConfig {
            backend: BackendKind::Remote,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_storage_kind() {
        assert_eq!(StoreConfig::default().build_storage().kind(), "local");
        let remote = StoreConfig {
            backend: BackendKind::Remote,
            remote: RemoteConfig {
                url: "http://localhost".into(),
                ..RemoteConfig::default()
            },
            ..StoreConfig::default()
        };
        assert_eq!(remote.build_storage().kind(), "remote");
    }
}
