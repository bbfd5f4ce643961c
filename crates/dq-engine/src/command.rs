//! Shell command construction
//!
//! The workflow runs as one shell pipeline: the main executable first, then
//! every dependency and converter, all reading the same resolved
//! configuration.
//!
//! ```text
//! o2-analysis-dq-table-maker-mc --configuration json://tempConfig.json ... -b
//!   | o2-analysis-timestamp --configuration json://tempConfig.json -b
//!   | ...
//! ```

use std::fmt;

/// Optional converter executables appended after the dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// MC format converter
    Mc,
    /// FDD converter
    Fdd,
    /// Track propagation, replaces the track extension dependency
    TrackPropagation,
}

impl Converter {
    /// Executable name
    #[must_use]
    pub const fn executable(self) -> &'static str {
        match self {
            Self::Mc => "o2-analysis-mc-converter",
            Self::Fdd => "o2-analysis-fdd-converter",
            Self::TrackPropagation => "o2-analysis-track-propagation",
        }
    }
}

/// Everything needed to build the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    /// Main executable
    pub executable: String,
    /// Resolved configuration passed as `json://`
    pub config_path: String,
    /// `--severity` of the main executable
    pub severity: Option<String>,
    /// `--shm-segment-size` of the main executable
    pub shm_segment_size: Option<u64>,
    /// `--aod-memory-rate-limit` of the main executable
    pub aod_memory_rate_limit: Option<String>,
    /// Writer descriptor, `"false"` omits it
    pub writer: Option<String>,
    /// Executables piped after the main one
    pub dependencies: Vec<String>,
    /// Converters appended last
    pub converters: Vec<Converter>,
}

impl InvocationPlan {
    /// Plan running only the main executable
    pub fn new(executable: impl Into<String>, config_path: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            config_path: config_path.into(),
            severity: None,
            shm_segment_size: None,
            aod_memory_rate_limit: None,
            writer: None,
            dependencies: Vec::new(),
            converters: Vec::new(),
        }
    }

    /// Set the log severity of the main executable
    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    /// Set the shared memory segment size
    #[must_use]
    pub fn with_shm_segment_size(mut self, size: u64) -> Self {
        self.shm_segment_size = Some(size);
        self
    }

    /// Set the AOD memory rate limit
    #[must_use]
    pub fn with_aod_memory_rate_limit(mut self, limit: Option<String>) -> Self {
        self.aod_memory_rate_limit = limit;
        self
    }

    /// Set the writer descriptor; `"false"` disables writing
    #[must_use]
    pub fn with_writer(mut self, writer: Option<String>) -> Self {
        self.writer = writer.filter(|w| w != "false");
        self
    }

    /// Pipe dependencies after the main executable
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Append a converter
    #[must_use]
    pub fn with_converter(mut self, converter: Converter) -> Self {
        if !self.converters.contains(&converter) {
            self.converters.push(converter);
        }
        self
    }

    /// Build the command line
    #[must_use]
    pub fn command_line(&self) -> CommandLine {
        let mut main = format!("{} --configuration json://{}", self.executable, self.config_path);
        if let Some(severity) = &self.severity {
            main.push_str(&format!(" --severity {severity}"));
        }
        if let Some(size) = self.shm_segment_size {
            main.push_str(&format!(" --shm-segment-size {size}"));
        }
        if let Some(limit) = &self.aod_memory_rate_limit {
            main.push_str(&format!(" --aod-memory-rate-limit {limit}"));
        }
        if let Some(writer) = &self.writer {
            main.push_str(&format!(" --aod-writer-json {writer}"));
        }
        main.push_str(" -b");

        let mut segments = vec![main];
        let piped = self
            .dependencies
            .iter()
            .map(String::as_str)
            .chain(self.converters.iter().map(|c| c.executable()));
        for executable in piped {
            segments.push(format!(
                "{executable} --configuration json://{} -b",
                self.config_path
            ));
        }
        CommandLine { segments }
    }
}

/// A ready-to-run shell pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    segments: Vec<String>,
}

impl CommandLine {
    /// Pipeline stages, main executable first
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(" | "))
    }
}
