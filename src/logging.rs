//! Logging infrastructure for phashstore.
//!
//! The library logs through the `log` facade; the binary installs an
//! `env_logger` backend. Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! # Example
//!
//! ```rust,no_run
//! use phashstore::logging::init_logging;
//!
//! // Initialize with verbose mode (-v)
//! init_logging(1, false);
//! log::debug!("visible");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// Calling it again after a logger is installed is a no-op.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let level_style = buf.default_level_style(level);
        if verbose >= 1 {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} [{}] {}",
                buf.timestamp_seconds(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} {}",
                buf.timestamp_seconds(),
                level,
                record.args()
            )
        }
    });

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_level_default() {
        assert_eq!(determine_level(0, false), LevelFilter::Info);
    }

    #[test]
    fn test_determine_level_verbose() {
        assert_eq!(determine_level(1, false), LevelFilter::Debug);
        assert_eq!(determine_level(2, false), LevelFilter::Trace);
        assert_eq!(determine_level(3, false), LevelFilter::Trace);
    }

    #[test]
    fn test_determine_level_quiet_overrides_verbose() {
        assert_eq!(determine_level(0, true), LevelFilter::Error);
        assert_eq!(determine_level(2, true), LevelFilter::Error);
    }
}
