//! Checks on the environment and user-supplied paths
//!
//! Run before anything is written.

use std::path::{Path, PathBuf};

use dq_config::ConfigDocument;
use tracing::{info, warn};

/// Stage and parameter holding the reader descriptor
const READER_PARAMETER: (&str, &str) = ("internal-dpl-aod-reader", "aod-reader-json");

/// Failed preflight checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreflightError {
    /// The analysis environment is not loaded
    #[error("{variable} is not set, load the analysis environment first")]
    EnvironmentNotLoaded {
        /// Variable that is unset
        variable: String,
    },

    /// `@list` file missing
    #[error("AOD file list {0} not found")]
    AodListNotFound(PathBuf),

    /// `.root` file missing
    #[error("AOD file {0} not found")]
    AodFileNotFound(PathBuf),

    /// Neither a `@list` nor a `.root` file
    #[error("AOD input {0} not found, check the file extension")]
    AodNotFound(PathBuf),

    /// Reader descriptor missing
    #[error("reader descriptor {0} not found")]
    ReaderNotFound(PathBuf),
}

/// Require an environment variable to be set
///
/// # Errors
/// Returns `EnvironmentNotLoaded` when the variable is unset
pub fn check_environment(variable: &str) -> Result<String, PreflightError> {
    match std::env::var(variable) {
        Ok(value) => {
            info!("environment {variable} = {value}");
            Ok(value)
        }
        Err(_) => Err(PreflightError::EnvironmentNotLoaded {
            variable: variable.to_string(),
        }),
    }
}

/// Check the AOD input: a `@list.txt` file list or a single file
///
/// # Errors
/// Returns an error naming the missing path
pub fn check_aod(aod: &str) -> Result<(), PreflightError> {
    let is_list = aod.starts_with('@') && (aod.ends_with("txt") || aod.ends_with("text"));
    if is_list {
        let path = Path::new(aod.trim_start_matches('@'));
        info!("AO2D list given as text file: {}", path.display());
        return found(path).ok_or_else(|| PreflightError::AodListNotFound(path.to_path_buf()));
    }

    let path = Path::new(aod);
    if aod.ends_with(".root") {
        info!("single AO2D file given: {}", path.display());
        return found(path).ok_or_else(|| PreflightError::AodFileNotFound(path.to_path_buf()));
    }
    found(path).ok_or_else(|| PreflightError::AodNotFound(path.to_path_buf()))
}

/// Check the reader descriptor: the given one, else the one in the document
///
/// # Errors
/// Returns `ReaderNotFound` when the file does not exist
pub fn check_reader(reader: Option<&str>, doc: &ConfigDocument) -> Result<(), PreflightError> {
    let (stage, parameter) = READER_PARAMETER;
    let configured = doc.get(stage, parameter).and_then(|value| value.as_text());
    let Some(reader) = reader.or(configured) else {
        warn!("no reader descriptor configured in [{stage}] {parameter}");
        return Ok(());
    };
    let path = Path::new(reader);
    if path.is_file() {
        Ok(())
    } else {
        Err(PreflightError::ReaderNotFound(path.to_path_buf()))
    }
}

fn found(path: &Path) -> Option<()> {
    if path.is_file() {
        info!("{} found", path.display());
        Some(())
    } else {
        None
    }
}
