//! phashstore - Perceptual-Deduplication Image Store
//!
//! Accepts raw image bytes, canonicalizes them to WebP, fingerprints them
//! with a 64-bit perceptual hash and either points at an already stored
//! near-duplicate or persists the image as `<identifier>.webp` on a local or
//! remote storage backend.

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod imaging;
pub mod index;
pub mod logging;
pub mod matcher;
pub mod sampler;
pub mod storage;
pub mod store;

pub use error::{SaveOutcome, SaveStatus, StoreError};
pub use fingerprint::{Fingerprint, Identifier};
pub use store::ImageStore;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands};
use crate::config::StoreConfig;
use crate::error::ExitCode;

/// Run the command-line application.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => StoreConfig::load_from_path(Some(path))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StoreConfig::load_from_path(StoreConfig::default_path().as_deref())
            .context("Failed to load configuration")?,
    };
    log::debug!("Using {:?} backend, collection {:?}", config.backend, config.collection);

    let store = ImageStore::open(config.build_storage(), &config)
        .context("Failed to build the image index")?;

    match cli.command {
        Commands::Save(args) => {
            let raw = std::fs::read(&args.file)
                .with_context(|| format!("Failed to read {}", args.file.display()))?;
            let threshold = args.threshold.unwrap_or(config.threshold);
            let outcome = store.save_image_bytes(&raw, args.force, threshold);
            println!("{}", serde_json::to_string(&outcome)?);
            Ok(if outcome.status.is_ok() {
                ExitCode::Success
            } else {
                ExitCode::Rejected
            })
        }
        Commands::Exists(args) => {
            let found = store.exists_by_identifier(&args.id)?;
            println!("{}", found);
            Ok(if found {
                ExitCode::Success
            } else {
                ExitCode::NotFound
            })
        }
        Commands::Pick(args) => {
            let exclude: Vec<Identifier> = args
                .exclude
                .into_iter()
                .map(Identifier::from_stored)
                .collect();
            match store.pick_random(&exclude) {
                Some(id) => {
                    println!("{}", id);
                    Ok(ExitCode::Success)
                }
                None => Ok(ExitCode::NotFound),
            }
        }
        Commands::Get(args) => {
            let id = Identifier::parse(&args.id)
                .with_context(|| format!("Invalid identifier {:?}", args.id))?;
            let bytes = match store.get_image_bytes(&id) {
                Ok(bytes) => bytes,
                Err(StoreError::Storage(e)) if e.is_not_found() => {
                    eprintln!("{}", e);
                    return Ok(ExitCode::NotFound);
                }
                Err(e) => return Err(e.into()),
            };
            std::fs::write(&args.output, &bytes)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
            log::info!("Wrote {} bytes to {}", bytes.len(), args.output.display());
            Ok(ExitCode::Success)
        }
        Commands::Rebuild => {
            println!("{}", store.len());
            Ok(ExitCode::Success)
        }
    }
}
