//! Command-line interface definitions for phashstore.
//!
//! # Example
//!
//! ```bash
//! # Store an image unless a near-duplicate (<= 5 bits apart) exists
//! phashstore save cat.jpg --threshold 5
//!
//! # Exact-fingerprint dedup only
//! phashstore save cat.jpg --force
//!
//! # Random stored image, skipping two identifiers
//! phashstore pick --exclude 一一一一一 --exclude 乀一一一一
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Perceptual-deduplication image store.
#[derive(Debug, Parser)]
#[command(name = "phashstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, value_name = "PATH", env = "PHASHSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Store an image unless a duplicate exists
    Save(SaveArgs),
    /// Check whether an identifier is stored
    Exists(ExistsArgs),
    /// Print a random stored identifier
    Pick(PickArgs),
    /// Copy a stored image to a file
    Get(GetArgs),
    /// Rebuild the index and print its size
    Rebuild,
}

/// Arguments for `save`.
#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Image file to store
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only treat identical fingerprints as duplicates
    #[arg(long)]
    pub force: bool,

    /// Maximum Hamming distance for near-duplicates (default from config)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(0..=64))]
    pub threshold: Option<u32>,
}

/// Arguments for `exists`.
#[derive(Debug, Args)]
pub struct ExistsArgs {
    /// Identifier to look up
    #[arg(value_name = "ID")]
    pub id: String,
}

/// Arguments for `pick`.
#[derive(Debug, Args)]
pub struct PickArgs {
    /// Identifiers to skip (can be specified multiple times)
    #[arg(short, long = "exclude", value_name = "ID")]
    pub exclude: Vec<String>,
}

/// Arguments for `get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Identifier of the stored image
    #[arg(value_name = "ID")]
    pub id: String,

    /// Output file
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,
}
