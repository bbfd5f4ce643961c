//! Runtime settings
//!
//! Loaded from a TOML file given with `--settings`; every key is optional.
//!
//! ```toml
//! output_dir = "run01"
//! severity = "error"
//! shm_segment_size = 12000000000
//! ```

use std::path::{Path, PathBuf};

use dq_engine::Workflow;
use serde::{Deserialize, Serialize};

/// Errors loading a settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("failed to read settings {path}: {source}")]
    Io {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for [`Settings`]
    #[error("invalid settings {path}: {source}")]
    Parse {
        /// Settings file
        path: PathBuf,
        /// Parser error
        source: toml::de::Error,
    },
}

/// Output locations and executable options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory for every written file, the working directory when unset
    pub output_dir: Option<PathBuf>,
    /// Resolved configuration written by table-maker-mc
    pub table_maker_mc_config: String,
    /// Resolved configuration written by table-reader
    pub table_reader_config: String,
    /// Writer descriptor file
    pub writer_descriptor: String,
    /// Reader descriptor file
    pub reader_descriptor: String,
    /// `--severity` of the main executable
    pub severity: String,
    /// `--shm-segment-size` of the main executable
    pub shm_segment_size: u64,
    /// Variable that proves the analysis environment is loaded
    pub environment_variable: String,
    /// Fail when the environment variable is unset
    pub require_environment: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            table_maker_mc_config: "tempConfigTableMakerMC.json".to_string(),
            table_reader_config: "tempConfigTableReader.json".to_string(),
            writer_descriptor: "aodWriterTempConfig.json".to_string(),
            reader_descriptor: "aodReaderTempConfig.json".to_string(),
            severity: "error".to_string(),
            shm_segment_size: 12_000_000_000,
            environment_variable: "O2PHYSICS_ROOT".to_string(),
            require_environment: true,
        }
    }
}

impl Settings {
    /// Load from a TOML file
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, defaults otherwise
    ///
    /// # Errors
    /// See [`Settings::load`]
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Write outputs into `dir`
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Toggle the environment check
    #[must_use]
    pub fn with_environment_check(mut self, required: bool) -> Self {
        self.require_environment = required;
        self
    }

    /// Set the executable log severity
    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    /// Location of an output file
    #[must_use]
    pub fn output_path(&self, name: &str) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Resolved configuration file of a workflow
    #[must_use]
    pub fn config_path(&self, workflow: Workflow) -> PathBuf {
        match workflow {
            Workflow::TableMakerMc => self.output_path(&self.table_maker_mc_config),
            Workflow::TableReader => self.output_path(&self.table_reader_config),
        }
    }

    /// Log file of a workflow
    #[must_use]
    pub fn log_path(&self, workflow: Workflow) -> PathBuf {
        self.output_path(&format!("{}.log", workflow.name()))
    }
}
