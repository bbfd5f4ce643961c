//! Static rule tables
//!
//! A [`RuleSet`] describes, for one workflow, every parameter the engine is
//! allowed to touch and how:
//!
//! ```text
//!   axes ──────────► SwitchRule      (member of axis ⇒ switch enabled)
//!   options ───────► OptionBinding   (free-form value overwrite)
//!                    ChoiceGroup     (exclusive group / toggle pair)
//!   selections ────► Implication     (auto-added members)
//!                    AxisDerivation  (axis computed from another one)
//!   document ──────► FlagRule        (enabled flag ⇒ companions enabled)
//!                    FamilyClosure   (ungoverned family ⇒ disabled)
//!                    DummyRule       (no skimmed switch ⇒ processDummy)
//! ```
//!
//! Tables are plain `'static` data. [`RuleSet::check`] runs once at startup
//! and rejects tables where two rules could write the same parameter.

use dq_config::Encoding;
use indexmap::{IndexMap, IndexSet};

use crate::error::RuleTableError;

/// Stages a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageScope {
    /// Every stage carrying the parameter
    Any,
    /// A single stage
    Only(&'static str),
    /// Every stage except one
    Except(&'static str),
}

impl StageScope {
    /// Check if the scope covers a stage
    #[inline]
    #[must_use]
    pub fn admits(self, stage: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(name) => name == stage,
            Self::Except(name) => name != stage,
        }
    }

    /// Check if some stage is covered by both scopes
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        match (self, other) {
            (Self::Only(a), Self::Only(b)) => a == b,
            (Self::Only(a), Self::Except(b)) | (Self::Except(b), Self::Only(a)) => a != b,
            _ => true,
        }
    }
}

/// A selection axis and its normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    /// Option name on the command line
    pub name: &'static str,
    /// Prepended to every identifier
    pub prefix: &'static str,
    /// Appended to every identifier
    pub suffix: &'static str,
    /// Accepted raw identifiers; empty accepts anything
    pub choices: &'static [&'static str],
}

impl AxisSpec {
    /// Axis whose identifiers are used as given
    #[must_use]
    pub const fn plain(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self {
            name,
            prefix: "",
            suffix: "",
            choices,
        }
    }

    /// Axis whose identifiers are wrapped in a prefix and suffix
    #[must_use]
    pub const fn affixed(
        name: &'static str,
        prefix: &'static str,
        suffix: &'static str,
        choices: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            prefix,
            suffix,
            choices,
        }
    }

    /// Canonical flag name for a raw identifier
    #[must_use]
    pub fn canonical(&self, raw: &str) -> String {
        format!("{}{raw}{}", self.prefix, self.suffix)
    }

    /// Check if a raw identifier is accepted
    #[must_use]
    pub fn accepts(&self, raw: &str) -> bool {
        self.choices.is_empty() || self.choices.contains(&raw)
    }
}

/// A process switch governed by membership in a selection axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchRule {
    /// Axis the member is looked up in
    pub axis: &'static str,
    /// Canonical member that enables the switch
    pub member: &'static str,
    /// Stages covered
    pub scope: StageScope,
    /// Parameter holding the switch
    pub parameter: &'static str,
    /// Sentinels written for the switches
    pub encoding: Encoding,
    /// Forced on in Override mode even when not selected
    pub always_true: bool,
}

impl SwitchRule {
    /// Switch whose parameter name is the canonical member itself
    #[must_use]
    pub const fn canonical(axis: &'static str, parameter: &'static str) -> Self {
        Self {
            axis,
            member: parameter,
            scope: StageScope::Any,
            parameter,
            encoding: Encoding::Boolean,
            always_true: false,
        }
    }

    /// Switch in a single stage, enabled by a member with a different name
    #[must_use]
    pub const fn keyed(
        axis: &'static str,
        member: &'static str,
        stage: &'static str,
        parameter: &'static str,
    ) -> Self {
        Self {
            axis,
            member,
            scope: StageScope::Only(stage),
            parameter,
            encoding: Encoding::Boolean,
            always_true: false,
        }
    }

    /// Use counter sentinels
    #[must_use]
    pub const fn counter(mut self) -> Self {
        self.encoding = Encoding::Counter;
        self
    }

    /// Restrict the stages the switch applies to
    #[must_use]
    pub const fn in_scope(mut self, scope: StageScope) -> Self {
        self.scope = scope;
        self
    }

    /// Keep the switch enabled in Override mode
    #[must_use]
    pub const fn always_true(mut self) -> Self {
        self.always_true = true;
        self
    }
}

/// Exclusive group of switches selected by one option value
///
/// Binary toggle pairs are groups of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceGroup {
    /// Option selecting the enabled member
    pub option: &'static str,
    /// Stages covered
    pub scope: StageScope,
    /// Sentinels written for the switches
    pub encoding: Encoding,
    /// `(option value, parameter)` pairs
    pub choices: &'static [(&'static str, &'static str)],
}

impl ChoiceGroup {
    /// Parameter enabled by an option value
    #[must_use]
    pub fn parameter_for(&self, value: &str) -> Option<&'static str> {
        self.choices
            .iter()
            .find(|(choice, _)| *choice == value)
            .map(|(_, parameter)| *parameter)
    }

    /// Accepted option values
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.choices.iter().map(|(v, _)| (*v).to_string()).collect()
    }

    /// Parameters of the group
    pub fn parameters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.choices.iter().map(|(_, parameter)| *parameter)
    }
}

/// Number of values a parameter holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Overwritten with the option value
    Single,
    /// Merged through multi-value set
    Multi,
}

/// Free-form option copied into a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionBinding {
    /// Option name on the command line
    pub option: &'static str,
    /// Parameter receiving the value
    pub parameter: &'static str,
    /// Stages covered
    pub scope: StageScope,
    /// Whether the value replaces or merges
    pub arity: Arity,
}

impl OptionBinding {
    /// Option written to the parameter of the same name
    #[must_use]
    pub const fn single(option: &'static str, parameter: &'static str) -> Self {
        Self {
            option,
            parameter,
            scope: StageScope::Any,
            arity: Arity::Single,
        }
    }

    /// Multi-valued option
    #[must_use]
    pub const fn multi(option: &'static str, parameter: &'static str) -> Self {
        Self {
            option,
            parameter,
            scope: StageScope::Any,
            arity: Arity::Multi,
        }
    }
}

/// Enabled flag requires companion flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagRule {
    /// Stage of the flag
    pub stage: &'static str,
    /// Flag that needs the companions
    pub flag: &'static str,
    /// `(stage, parameter)` pairs that must be enabled
    pub companions: &'static [(&'static str, &'static str)],
}

/// Cross-check between selection axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRule {
    /// Axis holding the member
    pub axis: &'static str,
    /// Member that triggers the check
    pub member: &'static str,
    /// Axis the requirements are looked up in
    pub required_axis: &'static str,
    /// Every listed member must be selected
    pub requires_all: &'static [&'static str],
    /// At least one listed member must be selected
    pub requires_any: &'static [&'static str],
}

/// Condition under which a member is implied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The axis is exercised at all
    AxisPresent(&'static str),
    /// The axis holds one of the listed members
    AnyMemberOf(&'static str, &'static [&'static str]),
}

/// Member added to an exercised axis when its trigger holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Implication {
    /// Condition adding the member
    pub trigger: Trigger,
    /// Axis receiving the member
    pub axis: &'static str,
    /// Implied member
    pub member: &'static str,
}

/// Axis computed from another when the user did not give it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisDerivation {
    /// Derived axis
    pub axis: &'static str,
    /// Axis the members are derived from
    pub source: &'static str,
    /// Member added when every listed source member is selected
    pub members: &'static [(&'static str, &'static [&'static str])],
}

/// Family of switches disabled when nothing governs them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyClosure {
    /// Stage holding the family
    pub stage: &'static str,
    /// Axis whose absence leaves the family ungoverned
    pub governing_axis: &'static str,
    /// `(axis, member)` that keeps the family alive
    pub family_key: (&'static str, &'static str),
    /// Switches of the family
    pub members: &'static [&'static str],
}

/// Automatic `processDummy` handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DummyRule {
    /// Option turning the automation off with `false`
    pub option: &'static str,
    /// Stages handled
    pub stages: &'static [&'static str],
    /// Dummy switch
    pub parameter: &'static str,
    /// Suffix of the switches that count as real work
    pub suffix: &'static str,
}

/// Selection member that may not meet an option value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForbiddenCombination {
    /// Axis holding the offending members
    pub axis: &'static str,
    /// Substring of the offending members
    pub member_contains: &'static str,
    /// Option holding the value
    pub option: &'static str,
    /// Document parameter consulted when the option is absent
    pub fallback: (&'static str, &'static str),
    /// Rejected value
    pub forbidden: &'static str,
    /// Explanation shown to the user
    pub reason: &'static str,
}

/// Complete rule tables of one workflow
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    /// Workflow name used in diagnostics
    pub name: &'static str,
    /// Selection axes
    pub axes: &'static [AxisSpec],
    /// Switches governed by axis membership
    pub switches: &'static [SwitchRule],
    /// Exclusive groups and toggle pairs
    pub choices: &'static [ChoiceGroup],
    /// Options copied into parameters
    pub bindings: &'static [OptionBinding],
    /// Companion requirements of enabled flags
    pub flag_rules: &'static [FlagRule],
    /// Cross-checks run before resolution
    pub selection_rules: &'static [SelectionRule],
    /// Members added to exercised axes
    pub implications: &'static [Implication],
    /// Axes computed when absent
    pub derivations: &'static [AxisDerivation],
    /// Families disabled when ungoverned
    pub closures: &'static [FamilyClosure],
    /// `processDummy` automation
    pub dummies: &'static [DummyRule],
    /// Rejected member and option pairs
    pub forbidden: &'static [ForbiddenCombination],
}

/// Companions of every flag, duplicates merged
pub type CompanionMap = IndexMap<(&'static str, &'static str), IndexSet<(&'static str, &'static str)>>;

impl RuleSet {
    /// Look up an axis
    #[must_use]
    pub fn axis(&self, name: &str) -> Option<&AxisSpec> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    /// Switch rule claiming a parameter in a stage
    #[must_use]
    pub fn switch_for(&self, stage: &str, parameter: &str) -> Option<&SwitchRule> {
        self.switches
            .iter()
            .find(|rule| rule.parameter == parameter && rule.scope.admits(stage))
    }

    /// Option binding claiming a parameter in a stage
    #[must_use]
    pub fn binding_for(&self, stage: &str, parameter: &str) -> Option<&OptionBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.parameter == parameter && binding.scope.admits(stage))
    }

    /// Choice group for an option name
    #[must_use]
    pub fn choice_group(&self, option: &str) -> Option<&ChoiceGroup> {
        self.choices.iter().find(|group| group.option == option)
    }

    /// Flag rules keyed by `(stage, flag)`, companions merged as a union
    #[must_use]
    pub fn companions(&self) -> CompanionMap {
        let mut merged = CompanionMap::new();
        for rule in self.flag_rules {
            merged
                .entry((rule.stage, rule.flag))
                .or_default()
                .extend(rule.companions.iter().copied());
        }
        merged
    }

    /// Validate the tables
    ///
    /// # Errors
    /// Returns the first defect found: an undeclared axis, a parameter
    /// claimed twice in overlapping scopes, or a flag referring to a
    /// parameter no switch rule owns.
    pub fn check(&self) -> Result<(), RuleTableError> {
        self.check_axes()?;
        self.check_claims()?;
        self.check_switch_references()
    }

    fn unknown_axis(&self, axis: &str) -> RuleTableError {
        RuleTableError::UnknownAxis {
            rules: self.name.to_string(),
            axis: axis.to_string(),
        }
    }

    fn check_axes(&self) -> Result<(), RuleTableError> {
        let mut referenced: Vec<&str> = Vec::new();
        referenced.extend(self.switches.iter().map(|r| r.axis));
        for rule in self.selection_rules {
            referenced.push(rule.axis);
            referenced.push(rule.required_axis);
        }
        for implication in self.implications {
            referenced.push(implication.axis);
            referenced.push(match implication.trigger {
                Trigger::AxisPresent(axis) | Trigger::AnyMemberOf(axis, _) => axis,
            });
        }
        for derivation in self.derivations {
            referenced.push(derivation.axis);
            referenced.push(derivation.source);
        }
        for closure in self.closures {
            referenced.push(closure.governing_axis);
            referenced.push(closure.family_key.0);
        }
        referenced.extend(self.forbidden.iter().map(|f| f.axis));

        match referenced.into_iter().find(|axis| self.axis(axis).is_none()) {
            Some(axis) => Err(self.unknown_axis(axis)),
            None => Ok(()),
        }
    }

    fn check_claims(&self) -> Result<(), RuleTableError> {
        let mut claims: Vec<(&str, StageScope, String)> = Vec::new();
        for rule in self.switches {
            claims.push((rule.parameter, rule.scope, format!("switch {}", rule.member)));
        }
        for group in self.choices {
            for parameter in group.parameters() {
                claims.push((parameter, group.scope, format!("choice {}", group.option)));
            }
        }
        for binding in self.bindings {
            claims.push((binding.parameter, binding.scope, format!("option {}", binding.option)));
        }
        for dummy in self.dummies {
            for stage in dummy.stages {
                claims.push((dummy.parameter, StageScope::Only(stage), format!("dummy {}", dummy.option)));
            }
        }

        for (i, (parameter, scope, owner)) in claims.iter().enumerate() {
            let clash = claims[i + 1..]
                .iter()
                .find(|(other, other_scope, _)| other == parameter && scope.overlaps(*other_scope));
            if let Some((_, _, other_owner)) = clash {
                return Err(RuleTableError::OverlappingClaims {
                    rules: self.name.to_string(),
                    parameter: (*parameter).to_string(),
                    first: owner.clone(),
                    second: other_owner.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_switch_references(&self) -> Result<(), RuleTableError> {
        let unknown = |parameter: &str| RuleTableError::UnknownSwitch {
            rules: self.name.to_string(),
            parameter: parameter.to_string(),
        };

        for rule in self.flag_rules {
            if self.switch_for(rule.stage, rule.flag).is_none() {
                return Err(unknown(rule.flag));
            }
            for (stage, parameter) in rule.companions {
                if self.switch_for(stage, parameter).is_none() {
                    return Err(unknown(parameter));
                }
            }
        }
        for closure in self.closures {
            if let Some(member) = closure
                .members
                .iter()
                .find(|member| self.switch_for(closure.stage, member).is_none())
            {
                return Err(unknown(member));
            }
        }
        Ok(())
    }
}
