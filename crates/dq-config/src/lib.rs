//! DQ Configuration Documents
//!
//! In-memory model of the JSON configuration consumed by the downstream
//! analysis executables.
//!
//! # Shape
//!
//! ```text
//! {
//!   "<stage>": { "<parameter>": "<value>", ... },   ← StageConfig
//!   ...
//! }
//! ```
//!
//! Values stay string-encoded on disk (`"true"`/`"false"`, `"1"`/`"-1"`).
//! Inside the workspace they are read and written through [`Switch`] and
//! [`Encoding`], so the sentinels only appear at this boundary.
//!
//! # Example
//!
//! ```
//! use dq_config::{ConfigDocument, Encoding, Switch};
//!
//! let mut doc = ConfigDocument::from_json_str(
//!     r#"{"analysis-track-selection": {"processSkimmed": "false"}}"#,
//! ).unwrap();
//!
//! let stage = doc.stage_mut("analysis-track-selection").unwrap();
//! stage.set_switch("processSkimmed", Switch::Enabled, Encoding::Boolean);
//!
//! assert_eq!(
//!     doc.switch("analysis-track-selection", "processSkimmed", Encoding::Boolean),
//!     Some(Switch::Enabled)
//! );
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod switch;

pub use document::{ConfigDocument, ParamValue, StageConfig};
pub use error::{ConfigError, ConfigResult};
pub use switch::{Encoding, Switch};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
