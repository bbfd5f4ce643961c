//! Workflow profiles and the resolution pipeline
//!
//! ```text
//! raw selections ─► normalize ─► cross-check ─► resolve ─► validate ─► artifacts
//!                                                  ▲
//! base document ───────────────────────────────────┘
//! ```
//!
//! [`run`] performs the whole pass on an owned document. Nothing is
//! written to disk here; the caller persists the outcome only when the
//! pass succeeded.

use std::fmt;
use std::path::Path;

use dq_config::{ConfigDocument, ConfigError};
use tracing::info;

use crate::artifacts::{ArtifactOptions, ArtifactTables, Artifacts};
use crate::error::{EngineError, EngineResult};
use crate::resolve::{ResolutionMode, Resolver};
use crate::rules::RuleSet;
use crate::selection::{RawSelections, Selections};
use crate::tables::{table_maker_mc, table_reader};
use crate::validate::DependencyValidator;

/// Supported workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    /// Skimming over simulated data
    TableMakerMc,
    /// Analysis over skimmed data
    TableReader,
}

impl Workflow {
    /// Every workflow
    pub const ALL: [Self; 2] = [Self::TableMakerMc, Self::TableReader];

    /// Rule tables
    #[must_use]
    pub fn rules(self) -> &'static RuleSet {
        match self {
            Self::TableMakerMc => &table_maker_mc::RULES,
            Self::TableReader => &table_reader::RULES,
        }
    }

    /// Artifact lookup, for workflows that write tables
    #[must_use]
    pub fn artifact_tables(self) -> Option<&'static ArtifactTables> {
        match self {
            Self::TableMakerMc => Some(&table_maker_mc::ARTIFACTS),
            Self::TableReader => None,
        }
    }

    /// Stage that must exist in the base document
    #[must_use]
    pub const fn task_stage(self) -> &'static str {
        match self {
            Self::TableMakerMc => table_maker_mc::TASK_STAGE,
            Self::TableReader => table_reader::TASK_STAGE,
        }
    }

    /// Main executable
    #[must_use]
    pub const fn executable(self) -> &'static str {
        match self {
            Self::TableMakerMc => table_maker_mc::EXECUTABLE,
            Self::TableReader => table_reader::EXECUTABLE,
        }
    }

    /// Check if the workflow reads simulated data
    #[must_use]
    pub const fn simulation(self) -> bool {
        matches!(self, Self::TableMakerMc)
    }

    /// Short name, also used for the log file
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TableMakerMc => "tableMakerMC",
            Self::TableReader => "tableReader",
        }
    }

    /// Validate the static tables
    ///
    /// # Errors
    /// Returns the first rule-table defect
    pub fn check_tables(self) -> EngineResult<()> {
        self.rules().check()?;
        if let Some(tables) = self.artifact_tables() {
            tables.check(self.rules())?;
        }
        Ok(())
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a successful pass
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Resolved document
    pub document: ConfigDocument,
    /// Normalized selections
    pub selections: Selections,
    /// Present for workflows that write tables
    pub artifacts: Option<Artifacts>,
}

/// Load a base document
///
/// # Errors
/// Returns `EngineError::Config` when the path is not `.json` or the file
/// cannot be read or parsed
pub fn load_document(path: impl AsRef<Path>) -> EngineResult<ConfigDocument> {
    let document = ConfigDocument::load(path.as_ref())?;
    info!("loaded {}", path.as_ref().display());
    Ok(document)
}

/// Run one resolution pass
///
/// # Errors
/// Fails on rule-table defects, a missing task stage, invalid selections
/// and violated dependencies. The document is consumed either way.
pub fn run(
    workflow: Workflow,
    mut document: ConfigDocument,
    raw: &RawSelections,
    mode: ResolutionMode,
    options: ArtifactOptions,
) -> EngineResult<Outcome> {
    workflow.check_tables()?;

    document
        .require_stage(workflow.task_stage())
        .map_err(|err| match err {
            ConfigError::StageNotFound(stage) => EngineError::MissingMandatoryStage(stage),
            other => EngineError::Config(other),
        })?;

    let rules = workflow.rules();
    let selections = Selections::normalize(raw, rules)?;
    let validator = DependencyValidator::new(rules);
    validator.validate_selections(&selections)?;

    info!(workflow = %workflow, "mode: {}", if mode.is_override() { "override" } else { "additive" });
    Resolver::new(rules, mode).resolve(&mut document, &selections);
    validator.validate(&document, &selections)?;

    let artifacts = workflow.artifact_tables().map(|tables| {
        let options = ArtifactOptions {
            simulation: options.simulation && workflow.simulation(),
            ..options
        };
        tables.build(&document, options)
    });

    Ok(Outcome {
        document,
        selections,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DependencyError;
    use serde_json::json;

    #[test]
    fn all_tables_pass_startup_checks() {
        for workflow in Workflow::ALL {
            workflow.check_tables().unwrap();
        }
    }

    #[test]
    fn missing_task_stage_is_fatal() {
        let doc = ConfigDocument::from_value(json!({"tof-pid": {}})).unwrap();
        let err = run(
            Workflow::TableMakerMc,
            doc,
            &RawSelections::new(),
            ResolutionMode::Override,
            ArtifactOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingMandatoryStage(stage) if stage == "table-maker-m-c"));
    }

    #[test]
    fn load_errors_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.txt");
        std::fs::write(&path, "{}").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.is_user_error());

        let err = load_document(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::Io { .. })));
    }

    #[test]
    fn reader_has_no_artifacts() {
        let doc = ConfigDocument::from_value(json!({
            "analysis-event-selection": {"processSkimmed": "true"}
        }))
        .unwrap();
        let outcome = run(
            Workflow::TableReader,
            doc,
            &RawSelections::new(),
            ResolutionMode::Override,
            ArtifactOptions::default(),
        )
        .unwrap();
        assert!(outcome.artifacts.is_none());
    }

    #[test]
    fn selection_errors_stop_before_resolution() {
        let doc = ConfigDocument::from_value(json!({
            "analysis-event-selection": {"processSkimmed": "true"}
        }))
        .unwrap();
        let raw = RawSelections::new().axis("analysis", ["eventMixingVn"]);
        let err = run(
            Workflow::TableReader,
            doc,
            &raw,
            ResolutionMode::Override,
            ArtifactOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Dependency(DependencyError::MissingAlternative { .. })
        ));
    }
}
