//! Error types for configuration documents
//!
//! Covers the ingress (path and JSON checks), egress (serialization and
//! writes) and lookup failures of a [`crate::ConfigDocument`].

use std::path::PathBuf;

/// Errors raised while loading, querying or writing a configuration document
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration path does not carry a `.json` suffix
    #[error("invalid config format: {} is not a JSON file", path.display())]
    InvalidFormat {
        /// Rejected path
        path: PathBuf,
    },

    /// Content could not be parsed as JSON
    #[error("invalid JSON in {origin}: {source}")]
    InvalidJson {
        /// File or source the text came from
        origin: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// Top-level JSON value is not an object of stages
    #[error("configuration root must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// IO error during read or write
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A required stage is absent from the document
    #[error("stage not found in configuration: {0}")]
    StageNotFound(String),

    /// Serialization of the document failed
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create JSON parse error with a description of where the text came from
    pub fn invalid_json(origin: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidJson {
            origin: origin.into(),
            source,
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_format_display() {
        let err = ConfigError::InvalidFormat {
            path: PathBuf::from("config.yaml"),
        };
        assert_eq!(
            err.to_string(),
            "invalid config format: config.yaml is not a JSON file"
        );
    }

    #[test]
    fn stage_not_found_display() {
        let err = ConfigError::StageNotFound("table-maker-m-c".to_string());
        assert!(err.to_string().contains("table-maker-m-c"));
    }
}
