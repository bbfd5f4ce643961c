//! Rules for the analysis workflow run over skimmed data

use crate::rules::{
    AxisDerivation, AxisSpec, DummyRule, FamilyClosure, FlagRule, Implication, OptionBinding,
    RuleSet, SelectionRule, StageScope, SwitchRule, Trigger,
};

/// Main task stage
pub const TASK_STAGE: &str = "analysis-event-selection";

/// Executable running the task
pub const EXECUTABLE: &str = "o2-analysis-dq-table-reader";

/// Reader descriptor used when none is given
pub const DEFAULT_READER: &str = "configs/readerConfiguration_reducedEvent.json";

/// Writer descriptor used when none is given
pub const DEFAULT_WRITER: &str = "configs/writerConfiguration_dileptons.json";

const EVENT_SELECTION: &str = "analysis-event-selection";
const TRACK_SELECTION: &str = "analysis-track-selection";
const MUON_SELECTION: &str = "analysis-muon-selection";
const EVENT_MIXING: &str = "analysis-event-mixing";
const SAME_EVENT_PAIRING: &str = "analysis-same-event-pairing";
const DILEPTON_HADRON: &str = "analysis-dilepton-hadron";

const SKIMMED: &str = "processSkimmed";

const ANALYSIS_CHOICES: &[&str] = &[
    "eventSelection",
    "trackSelection",
    "muonSelection",
    "eventMixing",
    "eventMixingVn",
    "sameEventPairing",
    "dileptonHadron",
];

const MIXING_CHOICES: &[&str] = &["Barrel", "Muon", "BarrelMuon", "BarrelVn", "MuonVn"];

const PROCESS_CHOICES: &[&str] = &[
    "JpsiToEE",
    "JpsiToMuMu",
    "JpsiToMuMuVertexing",
    "VnJpsiToEE",
    "VnJpsiToMuMu",
    "ElectronMuon",
    "All",
];

const AXES: &[AxisSpec] = &[
    AxisSpec::plain("analysis", ANALYSIS_CHOICES),
    AxisSpec::plain("mixing", MIXING_CHOICES),
    AxisSpec::affixed("process", "process", "Skimmed", PROCESS_CHOICES),
];

const fn mixing(member: &'static str, parameter: &'static str) -> SwitchRule {
    SwitchRule::keyed("mixing", member, EVENT_MIXING, parameter)
}

const fn pairing(parameter: &'static str) -> SwitchRule {
    SwitchRule::canonical("process", parameter).in_scope(StageScope::Only(SAME_EVENT_PAIRING))
}

const SEP_SWITCHES: &[&str] = &[
    "processJpsiToEESkimmed",
    "processJpsiToMuMuSkimmed",
    "processJpsiToMuMuVertexingSkimmed",
    "processVnJpsiToEESkimmed",
    "processVnJpsiToMuMuSkimmed",
    "processElectronMuonSkimmed",
    "processAllSkimmed",
];

const SWITCHES: &[SwitchRule] = &[
    SwitchRule::keyed("analysis", "eventSelection", EVENT_SELECTION, SKIMMED).always_true(),
    SwitchRule::keyed("analysis", "trackSelection", TRACK_SELECTION, SKIMMED),
    SwitchRule::keyed("analysis", "muonSelection", MUON_SELECTION, SKIMMED),
    SwitchRule::keyed("analysis", "dileptonHadron", DILEPTON_HADRON, SKIMMED),
    mixing("Barrel", "processBarrelSkimmed"),
    mixing("Muon", "processMuonSkimmed"),
    mixing("BarrelMuon", "processBarrelMuonSkimmed"),
    mixing("BarrelVn", "processBarrelVnSkimmed"),
    mixing("MuonVn", "processMuonVnSkimmed"),
    pairing("processJpsiToEESkimmed"),
    pairing("processJpsiToMuMuSkimmed"),
    pairing("processJpsiToMuMuVertexingSkimmed"),
    pairing("processVnJpsiToEESkimmed"),
    pairing("processVnJpsiToMuMuSkimmed"),
    pairing("processElectronMuonSkimmed"),
    pairing("processAllSkimmed"),
];

const BINDINGS: &[OptionBinding] = &[
    OptionBinding::single("aod", "aod-file"),
    OptionBinding::single("reader", "aod-reader-json"),
    OptionBinding::single("cfgQA", "cfgQA"),
    OptionBinding::multi("cfgMixingVars", "cfgMixingVars"),
    OptionBinding::multi("cfgEventCuts", "cfgEventCuts"),
    OptionBinding::multi("cfgTrackCuts", "cfgTrackCuts"),
    OptionBinding::multi("cfgMuonCuts", "cfgMuonCuts"),
    OptionBinding::multi("cfgLeptonCuts", "cfgLeptonCuts"),
];

const NEEDS_TRACKS: &[(&str, &str)] = &[(TRACK_SELECTION, SKIMMED)];
const NEEDS_MUONS: &[(&str, &str)] = &[(MUON_SELECTION, SKIMMED)];
const NEEDS_BOTH: &[(&str, &str)] = &[(TRACK_SELECTION, SKIMMED), (MUON_SELECTION, SKIMMED)];
const NEEDS_ALL: &[(&str, &str)] = &[
    (EVENT_SELECTION, SKIMMED),
    (TRACK_SELECTION, SKIMMED),
    (MUON_SELECTION, SKIMMED),
];

const fn requires(
    stage: &'static str,
    flag: &'static str,
    companions: &'static [(&'static str, &'static str)],
) -> FlagRule {
    FlagRule {
        stage,
        flag,
        companions,
    }
}

const FLAG_RULES: &[FlagRule] = &[
    requires(SAME_EVENT_PAIRING, "processJpsiToEESkimmed", NEEDS_TRACKS),
    requires(SAME_EVENT_PAIRING, "processJpsiToMuMuSkimmed", NEEDS_MUONS),
    requires(SAME_EVENT_PAIRING, "processJpsiToMuMuVertexingSkimmed", NEEDS_MUONS),
    requires(SAME_EVENT_PAIRING, "processVnJpsiToEESkimmed", NEEDS_TRACKS),
    requires(SAME_EVENT_PAIRING, "processVnJpsiToMuMuSkimmed", NEEDS_MUONS),
    requires(SAME_EVENT_PAIRING, "processElectronMuonSkimmed", NEEDS_BOTH),
    requires(SAME_EVENT_PAIRING, "processAllSkimmed", NEEDS_ALL),
    requires(EVENT_MIXING, "processBarrelSkimmed", NEEDS_TRACKS),
    requires(EVENT_MIXING, "processMuonSkimmed", NEEDS_MUONS),
    requires(EVENT_MIXING, "processBarrelMuonSkimmed", NEEDS_BOTH),
    requires(EVENT_MIXING, "processBarrelVnSkimmed", NEEDS_TRACKS),
    requires(EVENT_MIXING, "processMuonVnSkimmed", NEEDS_MUONS),
];

const fn mixing_needs(member: &'static str, analyses: &'static [&'static str]) -> SelectionRule {
    SelectionRule {
        axis: "mixing",
        member,
        required_axis: "analysis",
        requires_all: analyses,
        requires_any: &[],
    }
}

const fn needs_lepton(member: &'static str) -> SelectionRule {
    SelectionRule {
        axis: "analysis",
        member,
        required_axis: "analysis",
        requires_all: &[],
        requires_any: &["trackSelection", "muonSelection"],
    }
}

const SELECTION_RULES: &[SelectionRule] = &[
    needs_lepton("eventMixing"),
    needs_lepton("eventMixingVn"),
    mixing_needs("Barrel", &["eventMixing", "trackSelection"]),
    mixing_needs("Muon", &["eventMixing", "muonSelection"]),
    mixing_needs("BarrelMuon", &["eventMixing", "trackSelection", "muonSelection"]),
    mixing_needs("BarrelVn", &["eventMixingVn", "trackSelection"]),
    mixing_needs("MuonVn", &["eventMixingVn", "muonSelection"]),
];

const IMPLICATIONS: &[Implication] = &[
    Implication {
        trigger: Trigger::AxisPresent("analysis"),
        axis: "analysis",
        member: "eventSelection",
    },
    Implication {
        trigger: Trigger::AnyMemberOf("process", SEP_SWITCHES),
        axis: "analysis",
        member: "sameEventPairing",
    },
];

const DERIVATIONS: &[AxisDerivation] = &[AxisDerivation {
    axis: "mixing",
    source: "analysis",
    members: &[
        ("Barrel", &["eventMixing", "trackSelection"]),
        ("Muon", &["eventMixing", "muonSelection"]),
        ("BarrelMuon", &["eventMixing", "trackSelection", "muonSelection"]),
        ("BarrelVn", &["eventMixingVn", "trackSelection"]),
        ("MuonVn", &["eventMixingVn", "muonSelection"]),
    ],
}];

const CLOSURES: &[FamilyClosure] = &[FamilyClosure {
    stage: SAME_EVENT_PAIRING,
    governing_axis: "process",
    family_key: ("analysis", "sameEventPairing"),
    members: SEP_SWITCHES,
}];

const DUMMIES: &[DummyRule] = &[DummyRule {
    option: "autoDummy",
    stages: &[
        EVENT_SELECTION,
        TRACK_SELECTION,
        MUON_SELECTION,
        EVENT_MIXING,
        SAME_EVENT_PAIRING,
        DILEPTON_HADRON,
    ],
    parameter: "processDummy",
    suffix: "Skimmed",
}];

/// Rule tables of the table-reader workflow
pub static RULES: RuleSet = RuleSet {
    name: "table-reader",
    axes: AXES,
    switches: SWITCHES,
    choices: &[],
    bindings: BINDINGS,
    flag_rules: FLAG_RULES,
    selection_rules: SELECTION_RULES,
    implications: IMPLICATIONS,
    derivations: DERIVATIONS,
    closures: CLOSURES,
    dummies: DUMMIES,
    forbidden: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_tables_are_consistent() {
        RULES.check().unwrap();
    }

    #[test]
    fn analysis_switches_are_keyed_per_stage() {
        let rule = RULES.switch_for(MUON_SELECTION, SKIMMED).unwrap();
        assert_eq!(rule.member, "muonSelection");
        assert!(RULES.switch_for("analysis-event-mixing", SKIMMED).is_none());
    }

    #[test]
    fn pairing_family_matches_process_axis() {
        let axis = RULES.axis("process").unwrap();
        for raw in PROCESS_CHOICES {
            assert!(SEP_SWITCHES.contains(&axis.canonical(raw).as_str()), "{raw}");
        }
    }
}
