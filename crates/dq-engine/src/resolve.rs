//! Flag resolution engine
//!
//! Walks every stage and parameter of a [`ConfigDocument`] and rewrites the
//! parameters the rule tables claim. Each rule writes exactly one canonical
//! value, so the outcome does not depend on the order stages or parameters
//! are visited, and a second pass changes nothing.
//!
//! Per stage, rules run in four steps:
//!
//! 1. switches and option bindings, parameter by parameter
//! 2. exclusive groups and toggle pairs, as a whole
//! 3. family closures
//! 4. dummy automation, which reads the switches settled above

use dq_config::{ConfigDocument, Encoding, ParamValue, StageConfig, Switch};
use indexmap::IndexSet;
use tracing::{debug, info};

use crate::rules::{Arity, ChoiceGroup, DummyRule, FamilyClosure, OptionBinding, RuleSet, SwitchRule};
use crate::selection::Selections;

/// How unselected switches are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Unselected switches of an exercised axis are disabled
    #[default]
    Override,
    /// Unselected switches keep their base value
    Additive,
}

impl ResolutionMode {
    /// Mode from the `onlySelect` option
    #[inline]
    #[must_use]
    pub const fn from_only_select(only_select: bool) -> Self {
        if only_select {
            Self::Override
        } else {
            Self::Additive
        }
    }

    /// Check if the mode is Override
    #[inline]
    #[must_use]
    pub const fn is_override(self) -> bool {
        matches!(self, Self::Override)
    }
}

/// Applies a rule set to a document
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    rules: &'r RuleSet,
    mode: ResolutionMode,
}

impl<'r> Resolver<'r> {
    /// Create a resolver
    #[must_use]
    pub const fn new(rules: &'r RuleSet, mode: ResolutionMode) -> Self {
        Self { rules, mode }
    }

    /// Resolution mode in use
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Resolve the document in place
    pub fn resolve<'d>(
        &self,
        doc: &'d mut ConfigDocument,
        selections: &Selections,
    ) -> &'d mut ConfigDocument {
        info!(rules = self.rules.name, mode = ?self.mode, "resolving configuration");
        for name in doc.stage_names() {
            if let Some(stage) = doc.stage_mut(&name) {
                self.resolve_stage(&name, stage, selections);
            }
        }
        doc
    }

    fn resolve_stage(&self, name: &str, stage: &mut StageConfig, selections: &Selections) {
        for parameter in stage.parameter_names() {
            if let Some(rule) = self.rules.switch_for(name, &parameter) {
                if let Some(switch) = self.decide(rule, selections) {
                    write_switch(name, stage, &parameter, switch, rule.encoding);
                }
            } else if let Some(binding) = self.rules.binding_for(name, &parameter) {
                self.apply_binding(name, stage, binding, selections);
            }
        }

        for group in self.rules.choices {
            apply_choice(name, stage, group, selections);
        }
        for closure in self.rules.closures {
            self.apply_closure(name, stage, closure, selections);
        }
        for dummy in self.rules.dummies {
            apply_dummy(name, stage, dummy, selections);
        }
    }

    fn decide(&self, rule: &SwitchRule, selections: &Selections) -> Option<Switch> {
        let set = selections.axis(rule.axis)?;
        if set.contains(rule.member) {
            return Some(Switch::Enabled);
        }
        match self.mode {
            ResolutionMode::Override => Some(Switch::from_bool(rule.always_true)),
            ResolutionMode::Additive => None,
        }
    }

    fn apply_binding(
        &self,
        name: &str,
        stage: &mut StageConfig,
        binding: &OptionBinding,
        selections: &Selections,
    ) {
        let Some(value) = selections.option(binding.option) else {
            return;
        };
        match binding.arity {
            Arity::Single => {
                let value = value.as_scalar();
                if stage.text(binding.parameter) != Some(value.as_str()) {
                    debug!(" - [{name}] {} : {value}", binding.parameter);
                    stage.set(binding.parameter, value);
                }
            }
            Arity::Multi => {
                if multi_value_set(stage, binding.parameter, &value.as_list(), self.mode) {
                    debug!(
                        " - [{name}] {} : {}",
                        binding.parameter,
                        display_value(stage.get(binding.parameter))
                    );
                }
            }
        }
    }

    fn apply_closure(
        &self,
        name: &str,
        stage: &mut StageConfig,
        closure: &FamilyClosure,
        selections: &Selections,
    ) {
        if closure.stage != name || !self.mode.is_override() {
            return;
        }
        if selections.axis(closure.governing_axis).is_some() {
            return;
        }
        let (key_axis, key_member) = closure.family_key;
        let key_selected = selections
            .axis(key_axis)
            .map_or(true, |set| set.contains(key_member));
        if key_selected {
            return;
        }

        for member in closure.members {
            if stage.contains(member) {
                let encoding = self
                    .rules
                    .switch_for(name, member)
                    .map_or(Encoding::Boolean, |rule| rule.encoding);
                write_switch(name, stage, member, Switch::Disabled, encoding);
            }
        }
    }
}

fn apply_choice(name: &str, stage: &mut StageConfig, group: &ChoiceGroup, selections: &Selections) {
    if !group.scope.admits(name) || !group.parameters().any(|p| stage.contains(p)) {
        return;
    }
    let Some(chosen) = selections
        .option(group.option)
        .and_then(|value| group.parameter_for(&value.as_scalar()))
    else {
        return;
    };
    for parameter in group.parameters() {
        let switch = Switch::from_bool(parameter == chosen);
        write_switch(name, stage, parameter, switch, group.encoding);
    }
}

fn apply_dummy(name: &str, stage: &mut StageConfig, dummy: &DummyRule, selections: &Selections) {
    if !dummy.stages.iter().any(|stage_name| *stage_name == name) {
        return;
    }
    let enabled = selections
        .option(dummy.option)
        .map_or(true, |value| value.as_scalar() != "false");
    if !enabled {
        return;
    }

    let any_skimmed = stage.iter().any(|(parameter, value)| {
        parameter.ends_with(dummy.suffix)
            && value.as_text().and_then(|raw| Encoding::Boolean.decode(raw)) == Some(Switch::Enabled)
    });
    write_switch(
        name,
        stage,
        dummy.parameter,
        Switch::from_bool(!any_skimmed),
        Encoding::Boolean,
    );
}

fn write_switch(name: &str, stage: &mut StageConfig, parameter: &str, switch: Switch, encoding: Encoding) {
    if stage.set_switch(parameter, switch, encoding) {
        debug!(" - [{name}] {parameter} : {}", encoding.sentinel(switch));
    }
}

fn display_value(value: Option<&ParamValue>) -> String {
    match value {
        Some(ParamValue::Text(text)) => text.clone(),
        Some(ParamValue::List(items)) => items.join(","),
        Some(ParamValue::Other(other)) => other.to_string(),
        None => String::new(),
    }
}

/// Merge a multi-valued option into a parameter
///
/// Override replaces the stored values, Additive appends the ones not yet
/// present. Duplicates collapse in both modes. A parameter stored as a JSON
/// list stays a list; anything else is written as a comma-joined string.
///
/// Returns `true` when the stored value changed.
pub fn multi_value_set(
    stage: &mut StageConfig,
    parameter: &str,
    values: &[String],
    mode: ResolutionMode,
) -> bool {
    let (as_list, current): (bool, Vec<String>) = match stage.get(parameter) {
        Some(ParamValue::List(items)) => (true, items.clone()),
        Some(ParamValue::Text(text)) => (
            false,
            text.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => (false, Vec::new()),
    };

    let merged: IndexSet<String> = match mode {
        ResolutionMode::Override => values.iter().cloned().collect(),
        ResolutionMode::Additive => current.into_iter().chain(values.iter().cloned()).collect(),
    };
    let merged: Vec<String> = merged.into_iter().collect();

    let value = if as_list {
        ParamValue::List(merged)
    } else {
        ParamValue::Text(merged.join(","))
    };
    if stage.get(parameter) == Some(&value) {
        return false;
    }
    stage.set(parameter, value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::RawSelections;
    use crate::tables::{table_maker_mc, table_reader};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    fn select(raw: &RawSelections, rules: &RuleSet) -> Selections {
        Selections::normalize(raw, rules).unwrap()
    }

    fn maker_doc() -> ConfigDocument {
        doc(json!({
            "table-maker-m-c": {
                "processFull": "false",
                "processMuonOnly": "true",
                "processOnlyBCs": "false",
                "cfgEventCuts": "eventStandard",
                "cfgMCsignals": ["eFromJpsi"]
            },
            "tof-pid": {"pid-el": "-1"},
            "tpc-pid": {"pid-el": "-1", "pid-mu": "1"},
            "tof-event-time": {"processFT0": "true", "processNoFT0": "false"},
            "d-q-barrel-track-selection": {"processWSlice": "true"}
        }))
    }

    #[test]
    fn override_enables_selected_and_disables_rest() {
        let mut doc = maker_doc();
        let sel = select(&RawSelections::new().axis("process", ["Full"]), &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);

        let stage = doc.stage("table-maker-m-c").unwrap();
        assert_eq!(stage.text("processFull"), Some("true"));
        assert_eq!(stage.text("processMuonOnly"), Some("false"));
        assert_eq!(stage.text("processOnlyBCs"), Some("true"));
    }

    #[test]
    fn additive_leaves_unselected_alone() {
        let mut doc = maker_doc();
        let sel = select(&RawSelections::new().axis("process", ["Full"]), &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Additive).resolve(&mut doc, &sel);

        let stage = doc.stage("table-maker-m-c").unwrap();
        assert_eq!(stage.text("processFull"), Some("true"));
        assert_eq!(stage.text("processMuonOnly"), Some("true"));
    }

    #[test]
    fn absent_axis_is_not_exercised() {
        let mut doc = maker_doc();
        let before = doc.clone();
        let sel = select(&RawSelections::new(), &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);
        assert_eq!(doc, before);
    }

    #[test]
    fn counters_respect_stage_exclusion() {
        let mut doc = maker_doc();
        let sel = select(&RawSelections::new().axis("pid", ["el"]), &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);

        assert_eq!(doc.stage("tof-pid").unwrap().text("pid-el"), Some("-1"));
        let tpc = doc.stage("tpc-pid").unwrap();
        assert_eq!(tpc.text("pid-el"), Some("1"));
        assert_eq!(tpc.text("pid-mu"), Some("-1"));
    }

    #[test]
    fn exclusive_group_sets_every_member() {
        let mut doc = maker_doc();
        let sel = select(&RawSelections::new().option("FT0", "OnlyFT0"), &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Additive).resolve(&mut doc, &sel);

        let stage = doc.stage("tof-event-time").unwrap();
        assert_eq!(stage.text("processOnlyFT0"), Some("true"));
        assert_eq!(stage.text("processFT0"), Some("false"));
        assert_eq!(stage.text("processNoFT0"), Some("false"));
        assert_eq!(stage.text("processRun2"), Some("false"));
    }

    #[test]
    fn toggle_pair_inserts_missing_partner() {
        let mut doc = maker_doc();
        let sel = select(&RawSelections::new().option("isWSlice", "false"), &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);

        let stage = doc.stage("d-q-barrel-track-selection").unwrap();
        assert_eq!(stage.text("processWSlice"), Some("false"));
        assert_eq!(stage.text("processWoSlice"), Some("true"));
        assert!(!doc.stage("tof-pid").unwrap().contains("processWSlice"));
    }

    #[test]
    fn options_overwrite_and_merge() {
        let mut doc = maker_doc();
        let raw = RawSelections::new()
            .option_many("cfgEventCuts", ["eventStandardNoINT7", "eventStandard"])
            .option_many("cfgMCsignals", ["muFromJpsi"]);
        let sel = select(&raw, &table_maker_mc::RULES);
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Additive).resolve(&mut doc, &sel);

        let stage = doc.stage("table-maker-m-c").unwrap();
        assert_eq!(stage.text("cfgEventCuts"), Some("eventStandard,eventStandardNoINT7"));
        assert_eq!(
            stage.get("cfgMCsignals"),
            Some(&ParamValue::List(vec!["eFromJpsi".to_string(), "muFromJpsi".to_string()]))
        );
    }

    #[test]
    fn multi_value_set_modes() {
        let mut stage: StageConfig = [("cuts", "a,b")].into_iter().collect();
        let values = vec!["b".to_string(), "c".to_string()];

        assert!(multi_value_set(&mut stage, "cuts", &values, ResolutionMode::Additive));
        assert_eq!(stage.text("cuts"), Some("a,b,c"));
        assert!(!multi_value_set(&mut stage, "cuts", &values, ResolutionMode::Additive));

        assert!(multi_value_set(&mut stage, "cuts", &values, ResolutionMode::Override));
        assert_eq!(stage.text("cuts"), Some("b,c"));
    }

    #[test]
    fn closure_disables_ungoverned_family() {
        let mut doc = doc(json!({
            "analysis-event-selection": {"processSkimmed": "true", "processDummy": "false"},
            "analysis-same-event-pairing": {
                "processJpsiToEESkimmed": "true",
                "processAllSkimmed": "false",
                "processDummy": "false"
            }
        }));
        let sel = select(&RawSelections::new().axis("analysis", ["trackSelection"]), &table_reader::RULES);
        Resolver::new(&table_reader::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);

        let sep = doc.stage("analysis-same-event-pairing").unwrap();
        assert_eq!(sep.text("processJpsiToEESkimmed"), Some("false"));
        assert!(!sep.contains("processElectronMuonSkimmed"));
        assert_eq!(sep.text("processDummy"), Some("true"));
        assert_eq!(
            doc.stage("analysis-event-selection").unwrap().text("processDummy"),
            Some("false")
        );
    }

    #[test]
    fn closure_skipped_in_additive_mode() {
        let mut doc = doc(json!({
            "analysis-same-event-pairing": {"processJpsiToEESkimmed": "true"}
        }));
        let sel = select(&RawSelections::new().axis("analysis", ["trackSelection"]), &table_reader::RULES);
        Resolver::new(&table_reader::RULES, ResolutionMode::Additive).resolve(&mut doc, &sel);
        assert_eq!(
            doc.stage("analysis-same-event-pairing").unwrap().text("processJpsiToEESkimmed"),
            Some("true")
        );
    }

    #[test]
    fn dummy_automation_can_be_disabled() {
        let mut doc = doc(json!({
            "analysis-muon-selection": {"processSkimmed": "true", "processDummy": "true"}
        }));
        let sel = select(&RawSelections::new().option("autoDummy", "false"), &table_reader::RULES);
        Resolver::new(&table_reader::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);
        assert_eq!(
            doc.stage("analysis-muon-selection").unwrap().text("processDummy"),
            Some("true")
        );
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut doc = maker_doc();
        let raw = RawSelections::new()
            .axis("process", ["BarrelOnly"])
            .axis("est", ["FT0M"])
            .option("isVertexZeq", "true")
            .option_many("cfgEventCuts", ["x"]);
        let sel = select(&raw, &table_maker_mc::RULES);
        let resolver = Resolver::new(&table_maker_mc::RULES, ResolutionMode::Additive);
        resolver.resolve(&mut doc, &sel);
        let once = doc.clone();
        resolver.resolve(&mut doc, &sel);
        assert_eq!(doc, once);
    }
}
