//! Analysis workflow over skimmed data

use dq_engine::InvocationPlan;

use super::{launch, log_summary, resolve, Report};
use crate::cli::WorkflowArgs;
use crate::preflight;
use crate::settings::Settings;

/// Resolve, check the reader descriptor, write the configuration and run
///
/// # Errors
/// Fails on preflight, engine, filesystem and spawn errors
pub fn execute(args: &WorkflowArgs, settings: &Settings, dry_run: bool) -> anyhow::Result<Report> {
    let outcome = resolve(args, settings)?;
    let reader = outcome.selections.option("reader").map(|value| value.as_scalar());
    preflight::check_reader(reader.as_deref(), &outcome.document)?;

    let config_path = settings.config_path(args.workflow);
    outcome.document.save(&config_path)?;

    let command = InvocationPlan::new(args.workflow.executable(), config_path.display().to_string())
        .with_writer(args.writer.clone())
        .command_line();
    log_summary(args, &command);
    let status = launch(&command, dry_run)?;

    Ok(Report {
        config_path: config_path.clone(),
        written: vec![config_path],
        command,
        status,
    })
}
