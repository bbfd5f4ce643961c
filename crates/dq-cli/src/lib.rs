//! # DQ CLI
//!
//! Front end of the `dq-workflow` binary: argument parsing, logging,
//! settings, preflight checks, file output and process invocation around
//! the [`dq_engine`] pass.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod preflight;
pub mod settings;

pub use cli::{Cli, GlobalArgs, WorkflowArgs};
pub use commands::{execute, exit_code, Report};
pub use settings::{Settings, SettingsError};
