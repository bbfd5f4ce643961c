//! Skimming workflow over simulated data

use anyhow::anyhow;
use dq_engine::InvocationPlan;
use tracing::{debug, info};

use super::{launch, log_summary, resolve, write_json, Report};
use crate::cli::WorkflowArgs;
use crate::settings::Settings;

/// Resolve, write the configuration and descriptors, run the pipeline
///
/// # Errors
/// Fails on preflight, engine, filesystem and spawn errors
pub fn execute(args: &WorkflowArgs, settings: &Settings, dry_run: bool) -> anyhow::Result<Report> {
    let outcome = resolve(args, settings)?;
    let artifacts = outcome
        .artifacts
        .as_ref()
        .ok_or_else(|| anyhow!("{} produced no table list", args.workflow))?;

    let config_path = settings.config_path(args.workflow);
    let writer_path = settings.output_path(&settings.writer_descriptor);
    let reader_path = settings.output_path(&settings.reader_descriptor);
    outcome.document.save(&config_path)?;
    write_json(&writer_path, &artifacts.writer_descriptor())?;
    write_json(&reader_path, &artifacts.reader_descriptor())?;

    let mut plan = InvocationPlan::new(args.workflow.executable(), config_path.display().to_string())
        .with_severity(settings.severity.as_str())
        .with_shm_segment_size(settings.shm_segment_size)
        .with_aod_memory_rate_limit(args.aod_memory_rate_limit.clone())
        .with_writer(Some(writer_path.display().to_string()))
        .with_dependencies(artifacts.dependencies.iter().cloned());
    for converter in &args.converters {
        debug!("{} added to the workflow", converter.executable());
        plan = plan.with_converter(*converter);
    }
    let command = plan.command_line();

    info!(
        "tables to produce: {}",
        artifacts.tables.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    log_summary(args, &command);
    let status = launch(&command, dry_run)?;

    Ok(Report {
        config_path: config_path.clone(),
        written: vec![config_path, writer_path, reader_path],
        command,
        status,
    })
}
