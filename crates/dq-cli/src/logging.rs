//! Log subscriber setup
//!
//! Console output goes to stderr. With `--logFile` the same events are
//! also written, without colors, to a file that is truncated on every run.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for a `--debug` level name
#[must_use]
pub fn directive(level: &str) -> Option<&'static str> {
    match level {
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARNING" => Some("warn"),
        "ERROR" | "CRITICAL" => Some("error"),
        _ => None,
    }
}

/// Install the global subscriber
///
/// `level` falls back to `RUST_LOG`, then to `info`.
///
/// # Errors
/// Fails when the log file cannot be created or a subscriber is already set
pub fn init(level: Option<&str>, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = match level.and_then(directive) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("failed to install the log subscriber")
}
