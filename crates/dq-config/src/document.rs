//! Configuration document model
//!
//! A [`ConfigDocument`] is an ordered mapping of stage name to
//! [`StageConfig`]. Key order from the input file is preserved so the
//! resolved file diffs cleanly against the base one.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ConfigError, ConfigResult};
use crate::switch::{Encoding, Switch};

/// Value of a single stage parameter
///
/// Parameters are strings in practice. List-typed parameters (arrays of
/// strings) and anything else the downstream format allows are kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Plain string value, including switch sentinels
    Text(String),
    /// Array of strings
    List(Vec<String>),
    /// Any other JSON value, never interpreted
    Other(JsonValue),
}

impl ParamValue {
    /// Borrow the value as text if it is a plain string
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is list-typed
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Parameters of one stage (one pluggable component of the executable)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageConfig {
    params: IndexMap<String, ParamValue>,
}

impl StageConfig {
    /// Create an empty stage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter value
    #[inline]
    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&ParamValue> {
        self.params.get(parameter)
    }

    /// Get a parameter as text
    #[inline]
    #[must_use]
    pub fn text(&self, parameter: &str) -> Option<&str> {
        self.params.get(parameter).and_then(ParamValue::as_text)
    }

    /// Check if the stage declares a parameter
    #[inline]
    #[must_use]
    pub fn contains(&self, parameter: &str) -> bool {
        self.params.contains_key(parameter)
    }

    /// Set a parameter, returning the previous value
    ///
    /// Existing parameters keep their position; new ones are appended.
    pub fn set(&mut self, parameter: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.params.insert(parameter.to_string(), value.into())
    }

    /// Decode a parameter as a switch
    #[must_use]
    pub fn switch(&self, parameter: &str, encoding: Encoding) -> Option<Switch> {
        self.text(parameter).and_then(|raw| encoding.decode(raw))
    }

    /// Write a switch using the given encoding
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_switch(&mut self, parameter: &str, switch: Switch, encoding: Encoding) -> bool {
        let sentinel = encoding.sentinel(switch);
        if self.text(parameter) == Some(sentinel) {
            return false;
        }
        self.set(parameter, sentinel);
        true
    }

    /// Parameter names in document order
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    /// Iterate over parameters in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the stage has no parameters
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for StageConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Top-level entry of the document
///
/// Non-object entries are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Entry {
    Stage(StageConfig),
    Opaque(JsonValue),
}

/// Full configuration document: stage name → stage parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    entries: IndexMap<String, Entry>,
}

impl ConfigDocument {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns error if the text is not JSON or its root is not an object
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Self::parse(json, "<inline>")
    }

    /// Build from an already parsed JSON value
    ///
    /// # Errors
    /// Returns error if the root is not an object
    pub fn from_value(value: JsonValue) -> ConfigResult<Self> {
        if !value.is_object() {
            return Err(ConfigError::NotAnObject(json_kind(&value)));
        }
        serde_json::from_value(value).map_err(|e| ConfigError::invalid_json("<value>", e))
    }

    /// Load a document from disk
    ///
    /// The path must end in `.json`; anything else is rejected before the
    /// file is opened.
    ///
    /// # Errors
    /// Returns `InvalidFormat`, `Io` or `InvalidJson`
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(ConfigError::InvalidFormat {
                path: path.to_path_buf(),
            });
        }

        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> ConfigResult<Self> {
        let value: JsonValue =
            serde_json::from_str(text).map_err(|e| ConfigError::invalid_json(origin, e))?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject(json_kind(&value)));
        }
        serde_json::from_value(value).map_err(|e| ConfigError::invalid_json(origin, e))
    }

    /// Serialize as indented JSON
    ///
    /// # Errors
    /// Returns error if serialization fails (rare for JSON)
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Convert into a plain JSON value
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_value(&self) -> ConfigResult<JsonValue> {
        serde_json::to_value(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Write the document to disk as indented JSON
    ///
    /// # Errors
    /// Returns `Serialization` or `Io`
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = self.to_json_pretty()?;
        std::fs::write(path, text).map_err(|e| ConfigError::io_error(path, e))
    }

    /// Get a stage
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageConfig> {
        match self.entries.get(name) {
            Some(Entry::Stage(stage)) => Some(stage),
            _ => None,
        }
    }

    /// Get a stage mutably
    pub fn stage_mut(&mut self, name: &str) -> Option<&mut StageConfig> {
        match self.entries.get_mut(name) {
            Some(Entry::Stage(stage)) => Some(stage),
            _ => None,
        }
    }

    /// Get a stage that a rule depends on
    ///
    /// # Errors
    /// Returns `StageNotFound` if the stage is absent
    pub fn require_stage(&self, name: &str) -> ConfigResult<&StageConfig> {
        self.stage(name)
            .ok_or_else(|| ConfigError::StageNotFound(name.to_string()))
    }

    /// Insert or replace a stage
    pub fn insert_stage(&mut self, name: &str, stage: StageConfig) {
        self.entries.insert(name.to_string(), Entry::Stage(stage));
    }

    /// Stage names in document order
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.stages().map(|(name, _)| name.to_string()).collect()
    }

    /// Iterate over stages in document order
    pub fn stages(&self) -> impl Iterator<Item = (&str, &StageConfig)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            Entry::Stage(stage) => Some((name.as_str(), stage)),
            Entry::Opaque(_) => None,
        })
    }

    /// Get a single parameter value
    #[must_use]
    pub fn get(&self, stage: &str, parameter: &str) -> Option<&ParamValue> {
        self.stage(stage).and_then(|s| s.get(parameter))
    }

    /// Decode a single parameter as a switch
    #[must_use]
    pub fn switch(&self, stage: &str, parameter: &str, encoding: Encoding) -> Option<Switch> {
        self.stage(stage).and_then(|s| s.switch(parameter, encoding))
    }

    /// Number of stages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages().count()
    }

    /// Check if the document has no stages
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
