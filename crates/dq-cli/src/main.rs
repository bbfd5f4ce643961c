use std::process::ExitCode;

use anyhow::Context;
use dq_cli::{execute, exit_code, logging, Cli, Settings};
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load_or_default(cli.global.settings.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let log_file = cli.global.log_file.then(|| settings.log_path(cli.run.workflow));
    if let Err(err) = logging::init(cli.global.debug.as_deref(), log_file.as_deref()) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    match execute(&cli, &settings).with_context(|| format!("{} failed", cli.run.workflow)) {
        Ok(report) if report.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
