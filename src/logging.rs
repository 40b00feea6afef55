//! Tracing subscriber setup.
//!
//! The terminal is in raw mode while the shell runs, so log output never
//! goes to stderr: it is written to a file or not at all.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the filter directives, e.g. `rawsh=debug`.
pub const FILTER_ENV: &str = "RAWSH_LOG";

/// Install a global subscriber writing to `log_file_path`.
///
/// The filter comes from `RAWSH_LOG` and defaults to `info`.
pub fn init_global(log_file_path: &Path) -> Result<()> {
    let log_file = File::create(log_file_path)
        .with_context(|| format!("can't create log file {}", log_file_path.display()))?;

    let env_filter =
        EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("can't install tracing subscriber")
}
