//! # DQ Engine
//!
//! Resolution engine for DQ workflow configurations.
//!
//! Given a base [`ConfigDocument`](dq_config::ConfigDocument) and the
//! user's selections, the engine decides every process switch the rule
//! tables own, checks cross-stage dependencies and derives what the run
//! needs around the main executable.
//!
//! ## Components
//!
//! - [`selection`]: raw input → canonical selection sets
//! - [`resolve`]: the flag resolution engine
//! - [`validate`]: dependency validator
//! - [`artifacts`]: dependencies, output tables, reader/writer descriptors
//! - [`command`]: shell pipeline construction
//! - [`workflow`]: workflow profiles and the full pass
//!
//! ## Example
//!
//! ```rust
//! use dq_config::ConfigDocument;
//! use dq_engine::{run, ArtifactOptions, RawSelections, ResolutionMode, Workflow};
//!
//! let base = ConfigDocument::from_json_str(
//!     r#"{"analysis-event-selection": {"processSkimmed": "false"}}"#,
//! ).unwrap();
//! let raw = RawSelections::new().axis("analysis", ["eventSelection"]);
//!
//! let outcome = run(
//!     Workflow::TableReader,
//!     base,
//!     &raw,
//!     ResolutionMode::Override,
//!     ArtifactOptions::default(),
//! ).unwrap();
//! assert_eq!(
//!     outcome.document.get("analysis-event-selection", "processSkimmed")
//!         .and_then(|v| v.as_text()),
//!     Some("true"),
//! );
//! ```

pub mod artifacts;
pub mod command;
pub mod error;
pub mod resolve;
pub mod rules;
pub mod selection;
pub mod tables;
pub mod validate;
pub mod workflow;

pub use artifacts::{
    ArtifactOptions, ArtifactTables, Artifacts, ReaderDescriptor, TableDescriptor,
    WriterDescriptor,
};
pub use command::{CommandLine, Converter, InvocationPlan};
pub use error::{DependencyError, EngineError, EngineResult, RuleTableError, SelectionError};
pub use resolve::{multi_value_set, ResolutionMode, Resolver};
pub use rules::RuleSet;
pub use selection::{OptionValue, RawSelections, SelectionSet, Selections};
pub use validate::DependencyValidator;
pub use workflow::{load_document, run, Outcome, Workflow};
