//! Workflow execution
//!
//! ```text
//! preflight ─► load base ─► engine pass ─► path checks ─► write ─► command ─► sh -c
//! ```
//!
//! Files are written only after the engine pass and every check succeeded.

pub mod table_maker_mc;
pub mod table_reader;

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use anyhow::Context;
use dq_engine::{
    load_document, run, ArtifactOptions, CommandLine, Converter, EngineError, Outcome, Workflow,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, WorkflowArgs};
use crate::preflight;
use crate::settings::Settings;

/// What a workflow run produced
#[derive(Debug)]
pub struct Report {
    /// Resolved configuration file
    pub config_path: PathBuf,
    /// Every file written, configuration first
    pub written: Vec<PathBuf>,
    /// Piped command line that was, or would be, started
    pub command: CommandLine,
    /// Exit status of the command, `None` on a dry run
    pub status: Option<ExitStatus>,
}

impl Report {
    /// Check if the run succeeded
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.map_or(true, |status| status.success())
    }
}

/// Run the workflow selected on the command line
///
/// # Errors
/// Fails on preflight, engine, filesystem and spawn errors
pub fn execute(cli: &Cli, settings: &Settings) -> anyhow::Result<Report> {
    match cli.run.workflow {
        Workflow::TableMakerMc => table_maker_mc::execute(&cli.run, settings, cli.global.dry_run),
        Workflow::TableReader => table_reader::execute(&cli.run, settings, cli.global.dry_run),
    }
}

/// Exit code for a failed run
///
/// Rule-table defects are not the user's fault and get their own code.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EngineError>() {
        Some(engine) if !engine.is_user_error() => 2,
        _ => 1,
    }
}

/// Preflight, load and resolve
pub(crate) fn resolve(args: &WorkflowArgs, settings: &Settings) -> anyhow::Result<Outcome> {
    if settings.require_environment {
        preflight::check_environment(&settings.environment_variable)?;
    }

    let document = load_document(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let options = ArtifactOptions {
        simulation: args.workflow.simulation(),
        track_propagation: args.converters.contains(&Converter::TrackPropagation),
    };
    let outcome = run(args.workflow, document, &args.selections, args.mode, options)?;

    if let Some(aod) = outcome.selections.option("aod") {
        preflight::check_aod(&aod.as_scalar())?;
    }
    Ok(outcome)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub(crate) fn log_summary(args: &WorkflowArgs, command: &CommandLine) {
    info!("command to run:");
    info!("{command}");
    info!("provided options:");
    for (name, value) in &args.provided {
        info!("--{name} : {value}");
    }
}

/// Spawn the pipeline through `sh -c`
pub(crate) fn launch(command: &CommandLine, dry_run: bool) -> anyhow::Result<Option<ExitStatus>> {
    if dry_run {
        info!("dry run, command not started");
        return Ok(None);
    }
    let status = std::process::Command::new("sh")
        .arg("-c")
        .arg(command.to_string())
        .status()
        .context("failed to start the workflow")?;
    info!(%status, "workflow finished");
    Ok(Some(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dq_engine::{DependencyError, RuleTableError};

    #[test]
    fn table_defects_get_their_own_exit_code() {
        let defect = EngineError::from(RuleTableError::UnknownAxis {
            rules: "table-reader".to_string(),
            axis: "mixing".to_string(),
        });
        let err = anyhow::Error::from(defect).context("tableReader failed");
        assert_eq!(exit_code(&err), 2);

        let user = EngineError::from(DependencyError::MissingSelection {
            axis: "mixing".to_string(),
            member: "Muon".to_string(),
            required_axis: "analysis".to_string(),
            required_member: "eventMixing".to_string(),
        });
        assert_eq!(exit_code(&anyhow::Error::from(user)), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }
}
