//! Dependency validator
//!
//! Two passes guard a run:
//!
//! - [`DependencyValidator::validate_selections`] cross-checks the
//!   normalized selections before the document is touched
//! - [`DependencyValidator::validate`] checks the resolved document: every
//!   enabled flag with a [`FlagRule`](crate::rules::FlagRule) needs all of
//!   its companions enabled, and forbidden combinations are rejected
//!
//! Any violation aborts the run before output is written.

use dq_config::{ConfigDocument, Encoding, Switch};
use tracing::{debug, error};

use crate::error::DependencyError;
use crate::rules::{ForbiddenCombination, RuleSet, SelectionRule};
use crate::selection::Selections;

/// Checks selections and resolved documents against a rule set
#[derive(Debug, Clone, Copy)]
pub struct DependencyValidator<'r> {
    rules: &'r RuleSet,
}

impl<'r> DependencyValidator<'r> {
    /// Create a validator
    #[must_use]
    pub const fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Cross-check selections between axes
    ///
    /// A rule fires when its member is selected. An absent required axis
    /// counts as an empty selection.
    ///
    /// # Errors
    /// Returns `MissingSelection` or `MissingAlternative`
    pub fn validate_selections(&self, selections: &Selections) -> Result<(), DependencyError> {
        for rule in self.rules.selection_rules {
            check_selection_rule(rule, selections).map_err(log_error)?;
        }
        Ok(())
    }

    /// Check a resolved document
    ///
    /// # Errors
    /// Returns `UnmetCompanion` for the first enabled flag missing a
    /// companion, or `ForbiddenCombination`
    pub fn validate(&self, doc: &ConfigDocument, selections: &Selections) -> Result<(), DependencyError> {
        for ((stage, flag), companions) in self.rules.companions() {
            if doc.switch(stage, flag, Encoding::Boolean) != Some(Switch::Enabled) {
                continue;
            }
            for (companion_stage, companion_parameter) in companions {
                let enabled = doc.switch(companion_stage, companion_parameter, Encoding::Boolean)
                    == Some(Switch::Enabled);
                if !enabled {
                    let err = DependencyError::UnmetCompanion {
                        stage: stage.to_string(),
                        flag: flag.to_string(),
                        companion_stage: companion_stage.to_string(),
                        companion_parameter: companion_parameter.to_string(),
                    };
                    return Err(log_error(err));
                }
            }
            debug!("[{stage}] {flag}: companions enabled");
        }

        for forbidden in self.rules.forbidden {
            check_forbidden(forbidden, doc, selections).map_err(log_error)?;
        }
        Ok(())
    }
}

fn log_error(err: DependencyError) -> DependencyError {
    error!("{err}");
    err
}

fn check_selection_rule(rule: &SelectionRule, selections: &Selections) -> Result<(), DependencyError> {
    if !selections.contains(rule.axis, rule.member) {
        return Ok(());
    }
    let required = |member: &str| selections.contains(rule.required_axis, member);

    if let Some(missing) = rule.requires_all.iter().find(|&&m| !required(m)) {
        return Err(DependencyError::MissingSelection {
            axis: rule.axis.to_string(),
            member: rule.member.to_string(),
            required_axis: rule.required_axis.to_string(),
            required_member: (*missing).to_string(),
        });
    }
    if !rule.requires_any.is_empty() && !rule.requires_any.iter().any(|&m| required(m)) {
        return Err(DependencyError::MissingAlternative {
            axis: rule.axis.to_string(),
            member: rule.member.to_string(),
            required_axis: rule.required_axis.to_string(),
            alternatives: rule.requires_any.iter().map(|m| (*m).to_string()).collect(),
        });
    }
    Ok(())
}

fn check_forbidden(
    rule: &ForbiddenCombination,
    doc: &ConfigDocument,
    selections: &Selections,
) -> Result<(), DependencyError> {
    let Some(set) = selections.axis(rule.axis) else {
        return Ok(());
    };
    let Some(member) = set.iter().find(|m| m.contains(rule.member_contains)) else {
        return Ok(());
    };

    let (stage, parameter) = rule.fallback;
    let value = match selections.option(rule.option) {
        Some(value) => Some(value.as_scalar()),
        None => doc.get(stage, parameter).and_then(|v| v.as_text()).map(str::to_string),
    };
    match value {
        Some(value) if value == rule.forbidden => Err(DependencyError::ForbiddenCombination {
            axis: rule.axis.to_string(),
            member: member.to_string(),
            option: rule.option.to_string(),
            value,
            reason: rule.reason.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{ResolutionMode, Resolver};
    use crate::selection::RawSelections;
    use crate::tables::{table_maker_mc, table_reader};
    use serde_json::json;

    fn select(raw: &RawSelections, rules: &RuleSet) -> Selections {
        Selections::normalize(raw, rules).unwrap()
    }

    #[test]
    fn explicit_mixing_needs_its_analyses() {
        let raw = RawSelections::new()
            .axis("analysis", ["trackSelection", "eventMixing"])
            .axis("mixing", ["Muon"]);
        let sel = select(&raw, &table_reader::RULES);
        let err = DependencyValidator::new(&table_reader::RULES)
            .validate_selections(&sel)
            .unwrap_err();
        assert_eq!(
            err,
            DependencyError::MissingSelection {
                axis: "mixing".to_string(),
                member: "Muon".to_string(),
                required_axis: "analysis".to_string(),
                required_member: "muonSelection".to_string(),
            }
        );
    }

    #[test]
    fn mixing_without_analysis_axis_is_rejected() {
        let raw = RawSelections::new().axis("mixing", ["BarrelVn"]);
        let sel = select(&raw, &table_reader::RULES);
        let err = DependencyValidator::new(&table_reader::RULES)
            .validate_selections(&sel)
            .unwrap_err();
        assert!(matches!(
            err,
            DependencyError::MissingSelection { required_member, .. } if required_member == "eventMixingVn"
        ));
    }

    #[test]
    fn event_mixing_needs_a_lepton_selection() {
        let raw = RawSelections::new().axis("analysis", ["eventMixing"]);
        let sel = select(&raw, &table_reader::RULES);
        let err = DependencyValidator::new(&table_reader::RULES)
            .validate_selections(&sel)
            .unwrap_err();
        assert!(matches!(err, DependencyError::MissingAlternative { member, .. } if member == "eventMixing"));
    }

    #[test]
    fn consistent_selections_pass() {
        let raw = RawSelections::new()
            .axis("analysis", ["muonSelection", "eventMixing"])
            .axis("mixing", ["Muon"]);
        let sel = select(&raw, &table_reader::RULES);
        assert!(DependencyValidator::new(&table_reader::RULES)
            .validate_selections(&sel)
            .is_ok());
    }

    #[test]
    fn unmet_companion_names_missing_flag() {
        let doc = ConfigDocument::from_value(json!({
            "analysis-muon-selection": {"processSkimmed": "false"},
            "analysis-same-event-pairing": {"processJpsiToMuMuSkimmed": "true"}
        }))
        .unwrap();
        let sel = select(&RawSelections::new(), &table_reader::RULES);
        let err = DependencyValidator::new(&table_reader::RULES)
            .validate(&doc, &sel)
            .unwrap_err();
        assert_eq!(err.missing_companion(), Some(("analysis-muon-selection", "processSkimmed")));
    }

    #[test]
    fn missing_companion_stage_counts_as_unmet() {
        let doc = ConfigDocument::from_value(json!({
            "analysis-same-event-pairing": {"processJpsiToEESkimmed": "true"}
        }))
        .unwrap();
        let sel = select(&RawSelections::new(), &table_reader::RULES);
        let err = DependencyValidator::new(&table_reader::RULES)
            .validate(&doc, &sel)
            .unwrap_err();
        assert_eq!(err.missing_companion(), Some(("analysis-track-selection", "processSkimmed")));
    }

    #[test]
    fn centrality_with_pp_is_forbidden() {
        let mut doc = ConfigDocument::from_value(json!({
            "table-maker-m-c": {"processFullWithCent": "false", "processOnlyBCs": "true"},
            "event-selection-task": {"syst": "pp"}
        }))
        .unwrap();
        let sel = select(
            &RawSelections::new().axis("process", ["FullWithCent"]),
            &table_maker_mc::RULES,
        );
        Resolver::new(&table_maker_mc::RULES, ResolutionMode::Override).resolve(&mut doc, &sel);

        let err = DependencyValidator::new(&table_maker_mc::RULES)
            .validate(&doc, &sel)
            .unwrap_err();
        assert!(matches!(err, DependencyError::ForbiddenCombination { value, .. } if value == "pp"));

        let sel = select(
            &RawSelections::new()
                .axis("process", ["FullWithCent"])
                .option("syst", "PbPb"),
            &table_maker_mc::RULES,
        );
        assert!(DependencyValidator::new(&table_maker_mc::RULES)
            .validate(&doc, &sel)
            .is_ok());
    }
}
