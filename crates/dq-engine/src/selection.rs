//! Selection model
//!
//! Raw user input arrives as loosely formatted strings: comma or space
//! separated lists, single tokens, or nothing at all. Normalization turns
//! it into canonical [`SelectionSet`]s per axis and typed option values.
//!
//! ```text
//!   --process "Full,MuonOnly"  ──► process: {processFull, processMuonOnly, processOnlyBCs}
//!   --pid el mu                ──► pid:     {pid-el, pid-mu}
//!   (no --est)                 ──► est:     not exercised
//! ```
//!
//! An axis that was never given is *not exercised*: switches gated by it
//! are left alone. An axis given with no value at all is an error.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::error::SelectionError;
use crate::rules::{RuleSet, Trigger};

/// Ordered, duplicate-free canonical identifiers of one axis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    members: IndexSet<String>,
}

impl SelectionSet {
    /// Create an empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, member: &str) -> bool {
        self.members.contains(member)
    }

    /// Add a member, returning `true` if it was new
    pub fn insert(&mut self, member: impl Into<String>) -> bool {
        self.members.insert(member.into())
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Number of members
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if no member is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", joined.join(", "))
    }
}

/// Value of a named option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Single(String),
    Many(Vec<String>),
}

impl OptionValue {
    /// Value as a single string, lists joined with commas
    #[must_use]
    pub fn as_scalar(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Many(values) => values.join(","),
        }
    }

    /// Value as a list, single values split on commas
    #[must_use]
    pub fn as_list(&self) -> Vec<String> {
        match self {
            Self::Single(value) => split_tokens(value),
            Self::Many(values) => values.iter().flat_map(|v| split_tokens(v)).collect(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::Single(value) => value.trim().is_empty(),
            Self::Many(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => write!(f, "{value}"),
            Self::Many(values) => write!(f, "{}", values.join(" ")),
        }
    }
}

/// Raw selections as collected from the command line
#[derive(Debug, Clone, Default)]
pub struct RawSelections {
    axes: Vec<(String, Vec<String>)>,
    options: Vec<(String, OptionValue)>,
}

impl RawSelections {
    /// Create an empty bundle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exercise an axis with raw values
    #[must_use]
    pub fn axis<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axes
            .push((name.to_string(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Set a single-valued option
    #[must_use]
    pub fn option(mut self, name: &str, value: impl Into<String>) -> Self {
        self.options
            .push((name.to_string(), OptionValue::Single(value.into())));
        self
    }

    /// Set a multi-valued option
    #[must_use]
    pub fn option_many<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.push((
            name.to_string(),
            OptionValue::Many(values.into_iter().map(Into::into).collect()),
        ));
        self
    }

    /// Check if nothing was given
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.options.is_empty()
    }
}

/// Normalized selections handed to the resolver and validator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    axes: BTreeMap<String, SelectionSet>,
    options: BTreeMap<String, OptionValue>,
}

impl Selections {
    /// Normalize raw input against a workflow's rules
    ///
    /// Steps, in order: reject blank arguments (all of them reported at
    /// once), canonicalize axis members, check exclusive option values,
    /// derive absent axes, add implied members.
    ///
    /// # Errors
    /// Returns `MissingArgument`, `UnknownAxis` or `InvalidChoice`
    pub fn normalize(raw: &RawSelections, rules: &RuleSet) -> Result<Self, SelectionError> {
        let mut forgotten: Vec<String> = Vec::new();
        let mut tokenized: Vec<(&str, Vec<String>)> = Vec::new();
        for (name, values) in &raw.axes {
            let tokens: Vec<String> = values.iter().flat_map(|v| split_tokens(v)).collect();
            if tokens.is_empty() {
                forgotten.push(name.clone());
            }
            tokenized.push((name.as_str(), tokens));
        }
        for (name, value) in &raw.options {
            if value.is_blank() {
                forgotten.push(name.clone());
            }
        }
        if !forgotten.is_empty() {
            return Err(SelectionError::MissingArgument { options: forgotten });
        }

        let mut selections = Self::default();
        for (name, tokens) in tokenized {
            let spec = rules
                .axis(name)
                .ok_or_else(|| SelectionError::UnknownAxis(name.to_string()))?;
            let set = selections.axes.entry(spec.name.to_string()).or_default();
            for token in tokens {
                if !spec.accepts(&token) {
                    return Err(SelectionError::InvalidChoice {
                        option: spec.name.to_string(),
                        value: token,
                        allowed: spec.choices.iter().map(|c| (*c).to_string()).collect(),
                    });
                }
                set.insert(spec.canonical(&token));
            }
        }

        for (name, value) in &raw.options {
            let value = match rules.choice_group(name) {
                Some(group) => {
                    let choice = value.as_scalar().trim().to_string();
                    if group.parameter_for(&choice).is_none() {
                        return Err(SelectionError::InvalidChoice {
                            option: name.clone(),
                            value: choice,
                            allowed: group.values(),
                        });
                    }
                    OptionValue::Single(choice)
                }
                None => value.clone(),
            };
            selections.options.insert(name.clone(), value);
        }

        selections.derive_axes(rules);
        selections.apply_implications(rules);
        Ok(selections)
    }

    fn derive_axes(&mut self, rules: &RuleSet) {
        for derivation in rules.derivations {
            if self.axes.contains_key(derivation.axis) {
                continue;
            }
            let Some(source) = self.axes.get(derivation.source) else {
                continue;
            };
            let derived: SelectionSet = derivation
                .members
                .iter()
                .filter(|(_, needs)| needs.iter().all(|need| source.contains(need)))
                .map(|(member, _)| *member)
                .collect();
            debug!(
                axis = derivation.axis,
                source = derivation.source,
                "derived {} from {}: {derived}",
                derivation.axis,
                derivation.source
            );
            self.axes.insert(derivation.axis.to_string(), derived);
        }
    }

    fn apply_implications(&mut self, rules: &RuleSet) {
        for implication in rules.implications {
            let triggered = match implication.trigger {
                Trigger::AxisPresent(axis) => self.axes.contains_key(axis),
                Trigger::AnyMemberOf(axis, members) => self
                    .axes
                    .get(axis)
                    .is_some_and(|set| members.iter().any(|m| set.contains(m))),
            };
            if !triggered {
                continue;
            }
            if let Some(set) = self.axes.get_mut(implication.axis) {
                if set.insert(implication.member) {
                    warn!(
                        "{} was missing from {} selections, added automatically",
                        implication.member, implication.axis
                    );
                }
            }
        }
    }

    /// Selection set of an axis, `None` when the axis was not exercised
    #[inline]
    #[must_use]
    pub fn axis(&self, name: &str) -> Option<&SelectionSet> {
        self.axes.get(name)
    }

    /// Check if an axis was exercised and holds a member
    #[must_use]
    pub fn contains(&self, axis: &str, member: &str) -> bool {
        self.axis(axis).is_some_and(|set| set.contains(member))
    }

    /// Value of an option
    #[inline]
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Exercised axes, sorted by name
    pub fn axes(&self) -> impl Iterator<Item = (&str, &SelectionSet)> {
        self.axes.iter().map(|(name, set)| (name.as_str(), set))
    }

    /// Given options, sorted by name
    pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Split a raw argument on commas and whitespace
#[must_use]
pub fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
