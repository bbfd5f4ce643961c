//! Command-line definition
//!
//! Workflow flags are generated from the rule tables: every selection axis,
//! option binding, exclusive choice and dummy switch becomes a flag whose id
//! is the option name the engine expects.
//!
//! ```text
//! dq-workflow [--debug LEVEL] [--logFile] [--settings FILE] [--dry-run]
//!     table-maker-mc <cfgFileName> [--process ...] [--pid ...] ...
//!     table-reader   <cfgFileName> [--analysis ...] [--process ...] ...
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dq_engine::rules::{Arity, RuleSet};
use dq_engine::tables::table_reader;
use dq_engine::{Converter, RawSelections, ResolutionMode, Workflow};

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
const BOOLEAN_VALUES: [&str; 2] = ["true", "false"];

/// Options shared by every workflow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Requested log level, `None` falls back to `RUST_LOG`
    pub debug: Option<String>,
    /// Mirror the log into `<workflow>.log`
    pub log_file: bool,
    /// TOML settings file
    pub settings: Option<PathBuf>,
    /// Write everything but do not spawn the command
    pub dry_run: bool,
}

/// Parsed arguments of one workflow subcommand
#[derive(Debug, Clone)]
pub struct WorkflowArgs {
    /// Selected workflow
    pub workflow: Workflow,
    /// Base configuration file
    pub config: PathBuf,
    /// Override or Additive, from `--onlySelect`
    pub mode: ResolutionMode,
    /// Axes and options as given
    pub selections: RawSelections,
    /// Converters requested with `--add_*` flags
    pub converters: Vec<Converter>,
    /// Rate limit handed to the main executable
    pub aod_memory_rate_limit: Option<String>,
    /// Writer descriptor handed to the executable, `"false"` disables it
    pub writer: Option<String>,
    /// Options given on the command line, in definition order
    pub provided: Vec<(String, String)>,
}

/// Fully parsed command line
#[derive(Debug, Clone)]
pub struct Cli {
    /// Options shared by every workflow
    pub global: GlobalArgs,
    /// Arguments of the selected workflow
    pub run: WorkflowArgs,
}

impl Cli {
    /// Parse the process arguments, exiting on usage errors
    #[must_use]
    pub fn parse() -> Self {
        command()
            .try_get_matches()
            .and_then(|matches| Self::from_matches(&matches))
            .unwrap_or_else(|err| err.exit())
    }

    /// Parse an explicit argument list
    ///
    /// # Errors
    /// Returns the clap error for invalid usage
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    /// Build from clap matches
    ///
    /// # Errors
    /// Fails when no workflow subcommand was given
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let global = GlobalArgs {
            debug: matches.get_one::<String>("debug").cloned(),
            log_file: matches.get_flag("logFile"),
            settings: matches.get_one::<PathBuf>("settings").cloned(),
            dry_run: matches.get_flag("dry-run"),
        };

        let Some((name, sub)) = matches.subcommand() else {
            return Err(command().error(ErrorKind::MissingSubcommand, "a workflow is required"));
        };
        let Some(workflow) = Workflow::ALL
            .into_iter()
            .find(|workflow| subcommand_name(*workflow) == name)
        else {
            return Err(command().error(
                ErrorKind::InvalidSubcommand,
                format!("unknown workflow {name}"),
            ));
        };

        Ok(Self {
            global,
            run: workflow_args(workflow, sub),
        })
    }
}

/// Subcommand name of a workflow
#[must_use]
pub const fn subcommand_name(workflow: Workflow) -> &'static str {
    match workflow {
        Workflow::TableMakerMc => "table-maker-mc",
        Workflow::TableReader => "table-reader",
    }
}

/// The complete clap command
#[must_use]
pub fn command() -> Command {
    Command::new("dq-workflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Configure and launch DQ skimming and analysis workflows")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .value_parser(LOG_LEVELS)
                .help("Log level"),
        )
        .arg(
            Arg::new("logFile")
                .long("logFile")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Also write the log to <workflow>.log"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Settings file (TOML)"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write the outputs and print the command without running it"),
        )
        .subcommand(workflow_command(Workflow::TableMakerMc))
        .subcommand(workflow_command(Workflow::TableReader))
}

/// Flag derived from the rule tables
struct OptionArg {
    name: &'static str,
    multi: bool,
    default: Option<&'static str>,
    help: String,
}

fn option_args(rules: &RuleSet) -> Vec<OptionArg> {
    let mut args: Vec<OptionArg> = Vec::new();
    for group in rules.choices {
        args.push(OptionArg {
            name: group.option,
            multi: false,
            default: None,
            help: format!("One of: {}", group.values().join(", ")),
        });
    }
    for binding in rules.bindings {
        let multi = binding.arity == Arity::Multi;
        if let Some(existing) = args.iter_mut().find(|arg| arg.name == binding.option) {
            existing.multi |= multi;
            continue;
        }
        args.push(OptionArg {
            name: binding.option,
            multi,
            default: None,
            help: format!("Sets {}", binding.parameter),
        });
    }
    for dummy in rules.dummies {
        args.push(OptionArg {
            name: dummy.option,
            multi: false,
            default: Some("true"),
            help: format!("Set {} when a stage runs nothing", dummy.parameter),
        });
    }
    args
}

fn workflow_command(workflow: Workflow) -> Command {
    let rules = workflow.rules();
    let about = match workflow {
        Workflow::TableMakerMc => "Skim simulated data into reduced tables",
        Workflow::TableReader => "Run the analysis tasks over reduced tables",
    };
    let mut cmd = Command::new(subcommand_name(workflow))
        .about(about)
        .arg(
            Arg::new("cfgFileName")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Base configuration file (.json)"),
        )
        .arg(
            Arg::new("onlySelect")
                .long("onlySelect")
                .default_value("true")
                .value_parser(BOOLEAN_VALUES)
                .help("true: selections replace the base switches, false: they are added"),
        );

    for axis in rules.axes {
        cmd = cmd.arg(
            Arg::new(axis.name)
                .long(axis.name)
                .num_args(1..)
                .help(format!("Selections: {}", axis.choices.join(", "))),
        );
    }
    for option in option_args(rules) {
        let mut arg = Arg::new(option.name).long(option.name).help(option.help);
        if option.multi {
            arg = arg.num_args(1..);
        }
        if let Some(default) = option.default {
            arg = arg.default_value(default).value_parser(BOOLEAN_VALUES);
        }
        cmd = cmd.arg(arg);
    }

    match workflow {
        Workflow::TableMakerMc => cmd
            .arg(switch_arg("add_mc_conv", "Append the MC converter"))
            .arg(switch_arg("add_fdd_conv", "Append the FDD converter"))
            .arg(switch_arg(
                "add_track_prop",
                "Append track propagation, replacing track extension",
            ))
            .arg(
                Arg::new("aod-memory-rate-limit")
                    .long("aod-memory-rate-limit")
                    .help("Rate limit for AOD memory usage"),
            ),
        Workflow::TableReader => cmd
            .mut_arg("reader", |arg| arg.default_value(table_reader::DEFAULT_READER))
            .arg(
                Arg::new("writer")
                    .long("writer")
                    .default_value(table_reader::DEFAULT_WRITER)
                    .help("Writer descriptor, 'false' disables writing"),
            ),
    }
}

fn switch_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn workflow_args(workflow: Workflow, matches: &ArgMatches) -> WorkflowArgs {
    let rules = workflow.rules();
    let mut selections = RawSelections::new();
    for axis in rules.axes {
        if let Some(values) = matches.get_many::<String>(axis.name) {
            selections = selections.axis(axis.name, values.cloned());
        }
    }
    for option in option_args(rules) {
        if option.multi {
            if let Some(values) = matches.get_many::<String>(option.name) {
                selections = selections.option_many(option.name, values.cloned());
            }
        } else if let Some(value) = matches.get_one::<String>(option.name) {
            selections = selections.option(option.name, value.clone());
        }
    }

    let only_select = matches
        .get_one::<String>("onlySelect")
        .map_or(true, |value| value == "true");

    let mut converters = Vec::new();
    let mut aod_memory_rate_limit = None;
    let mut writer = None;
    match workflow {
        Workflow::TableMakerMc => {
            let flags = [
                ("add_mc_conv", Converter::Mc),
                ("add_fdd_conv", Converter::Fdd),
                ("add_track_prop", Converter::TrackPropagation),
            ];
            converters.extend(
                flags
                    .into_iter()
                    .filter(|(flag, _)| matches.get_flag(flag))
                    .map(|(_, converter)| converter),
            );
            aod_memory_rate_limit = matches.get_one::<String>("aod-memory-rate-limit").cloned();
        }
        Workflow::TableReader => {
            writer = matches.get_one::<String>("writer").cloned();
        }
    }

    WorkflowArgs {
        workflow,
        config: matches
            .get_one::<PathBuf>("cfgFileName")
            .cloned()
            .unwrap_or_default(),
        mode: ResolutionMode::from_only_select(only_select),
        selections,
        converters,
        aod_memory_rate_limit,
        writer,
        provided: provided_options(workflow, matches),
    }
}

/// Declared arguments given on the command line, in declaration order
fn provided_options(workflow: Workflow, matches: &ArgMatches) -> Vec<(String, String)> {
    workflow_command(workflow)
        .get_arguments()
        .map(|arg| arg.get_id().as_str().to_string())
        .filter(|id| matches.value_source(id) == Some(ValueSource::CommandLine))
        .map(|id| {
            let values = matches
                .get_raw(&id)
                .map(|raw| {
                    raw.map(|value| value.to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            (id, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dq_engine::Selections;

    #[test]
    fn command_definition_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn option_ids_are_unique() {
        for workflow in Workflow::ALL {
            let args = option_args(workflow.rules());
            for (i, arg) in args.iter().enumerate() {
                assert!(
                    args[i + 1..].iter().all(|other| other.name != arg.name),
                    "{} declared twice",
                    arg.name
                );
            }
        }
    }

    #[test]
    fn only_select_defaults_to_override() {
        let cli = Cli::try_parse_from(["dq-workflow", "table-reader", "config.json"]).unwrap();
        assert!(cli.run.mode.is_override());
        assert_eq!(cli.run.writer.as_deref(), Some(table_reader::DEFAULT_WRITER));
        assert_eq!(
            cli.run.provided,
            vec![("cfgFileName".to_string(), "config.json".to_string())]
        );
    }

    #[test]
    fn reader_descriptor_has_a_default() {
        let cli = Cli::try_parse_from(["dq-workflow", "table-reader", "config.json"]).unwrap();
        let selections = Selections::normalize(&cli.run.selections, Workflow::TableReader.rules()).unwrap();
        assert_eq!(
            selections.option("reader").map(|value| value.as_scalar()).as_deref(),
            Some(table_reader::DEFAULT_READER)
        );
    }

    #[test]
    fn provided_options_are_declared_arguments() {
        let cli = Cli::try_parse_from([
            "dq-workflow",
            "table-maker-mc",
            "config.json",
            "--process",
            "BarrelOnly",
            "--add_fdd_conv",
        ])
        .unwrap();
        let declared = workflow_command(Workflow::TableMakerMc);
        let names: Vec<&str> = cli.run.provided.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["cfgFileName", "process", "add_fdd_conv"]);
        for name in names {
            assert!(declared.get_arguments().any(|arg| arg.get_id() == name));
            assert_ne!(name, subcommand_name(Workflow::TableMakerMc));
        }
    }

    #[test]
    fn log_file_flag_is_camel_case() {
        let cli = Cli::try_parse_from([
            "dq-workflow",
            "--debug",
            "DEBUG",
            "--logFile",
            "table-maker-mc",
            "config.json",
        ])
        .unwrap();
        assert!(cli.global.log_file);
        assert_eq!(cli.global.debug.as_deref(), Some("DEBUG"));

        let err = Cli::try_parse_from(["dq-workflow", "--log-file", "table-maker-mc", "config.json"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn missing_workflow_is_a_usage_error() {
        let err = Cli::try_parse_from(["dq-workflow", "--dry-run"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSubcommand);
    }
}
