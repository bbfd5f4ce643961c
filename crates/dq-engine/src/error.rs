//! Error types for the resolution engine
//!
//! Provides error handling for:
//! - Selection normalization (forgotten or invalid arguments)
//! - Dependency validation (unmet companions, failed cross-checks)
//! - Rule-table defects detected at startup
//! - The combined pipeline

use dq_config::ConfigError;

/// Errors while normalizing user selections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// Options given on the command line without a value
    #[error("missing argument value for: {}", options.join(", "))]
    MissingArgument {
        /// Names of the empty options
        options: Vec<String>,
    },

    /// Axis name not declared by the workflow
    #[error("unknown selection axis: {0}")]
    UnknownAxis(String),

    /// Value is not one of the declared choices of an exclusive option
    #[error("invalid value '{value}' for {option}, expected one of: {}", allowed.join(", "))]
    InvalidChoice {
        /// Option name
        option: String,
        /// Rejected value
        value: String,
        /// Accepted values
        allowed: Vec<String>,
    },
}

/// Violated dependency between flags or selections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// An enabled flag requires a companion flag that is not enabled
    #[error(
        "[{stage}] {flag} requires [{companion_stage}] {companion_parameter} to be enabled"
    )]
    UnmetCompanion {
        /// Stage of the enabled flag
        stage: String,
        /// Enabled flag
        flag: String,
        /// Stage of the missing companion
        companion_stage: String,
        /// Missing companion
        companion_parameter: String,
    },

    /// A selected member requires another selection that was not made
    #[error("{axis} '{member}' requires '{required_member}' in {required_axis} selections")]
    MissingSelection {
        /// Axis of the selected member
        axis: String,
        /// Selected member
        member: String,
        /// Axis the requirement is looked up in
        required_axis: String,
        /// Member that was not selected
        required_member: String,
    },

    /// A selected member requires at least one of several selections
    #[error("{axis} '{member}' requires one of [{}] in {required_axis} selections", alternatives.join(", "))]
    MissingAlternative {
        /// Axis of the selected member
        axis: String,
        /// Selected member
        member: String,
        /// Axis the requirement is looked up in
        required_axis: String,
        /// Members of which one was expected
        alternatives: Vec<String>,
    },

    /// A selected member is incompatible with an option value
    #[error("{axis} '{member}' cannot be used with {option} = {value}: {reason}")]
    ForbiddenCombination {
        /// Axis of the offending member
        axis: String,
        /// Offending member
        member: String,
        /// Option the member conflicts with
        option: String,
        /// Conflicting value
        value: String,
        /// Explanation shown to the user
        reason: String,
    },
}

impl DependencyError {
    /// Name of the missing companion, when the error is about one
    #[must_use]
    pub fn missing_companion(&self) -> Option<(&str, &str)> {
        match self {
            Self::UnmetCompanion {
                companion_stage,
                companion_parameter,
                ..
            } => Some((companion_stage.as_str(), companion_parameter.as_str())),
            _ => None,
        }
    }
}

/// Defects in the static rule tables
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleTableError {
    /// A rule refers to an axis the rule set does not declare
    #[error("rule set {rules}: undeclared axis '{axis}'")]
    UnknownAxis {
        /// Rule set name
        rules: String,
        /// Undeclared axis
        axis: String,
    },

    /// Two rules claim the same parameter in overlapping stage scopes
    #[error("rule set {rules}: parameter '{parameter}' claimed by both {first} and {second}")]
    OverlappingClaims {
        /// Rule set name
        rules: String,
        /// Parameter claimed twice
        parameter: String,
        /// First claiming rule
        first: String,
        /// Second claiming rule
        second: String,
    },

    /// A flag rule or family refers to a parameter that is not a switch
    #[error("rule set {rules}: '{parameter}' is not a declared switch")]
    UnknownSwitch {
        /// Rule set name
        rules: String,
        /// Referenced parameter
        parameter: String,
    },

    /// A process switch has no dependency/table lookup entry
    #[error("rule set {rules}: switch '{parameter}' has no artifact lookup entry")]
    MissingLookupEntry {
        /// Rule set name
        rules: String,
        /// Switch without an entry
        parameter: String,
    },

    /// A table is referenced but has no storage location
    #[error("rule set {rules}: table '{table}' has no storage location")]
    MissingTableLocation {
        /// Rule set name
        rules: String,
        /// Table without a location
        table: String,
    },
}

/// Combined engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Selections could not be normalized
    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    /// A dependency between flags or selections is violated
    #[error("dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// The static rule tables are inconsistent
    #[error("rule table error: {0}")]
    RuleTable(#[from] RuleTableError),

    /// The base document could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The workflow's main task stage is absent from the base document
    #[error("mandatory stage '{0}' not found in configuration")]
    MissingMandatoryStage(String),
}

impl EngineError {
    /// Check if the error stems from the user's input rather than the tables
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::RuleTable(_))
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
