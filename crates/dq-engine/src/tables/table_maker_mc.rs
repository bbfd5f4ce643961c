//! Rules for the skimming workflow run over simulated data

use dq_config::Encoding;

use crate::artifacts::{ArtifactTables, SwitchArtifacts, TableLocation, Umbrella};
use crate::rules::{
    AxisSpec, ChoiceGroup, FlagRule, ForbiddenCombination, Implication, OptionBinding, RuleSet,
    StageScope, SwitchRule, Trigger,
};

/// Main task stage
pub const TASK_STAGE: &str = "table-maker-m-c";

/// Executable running the task
pub const EXECUTABLE: &str = "o2-analysis-dq-table-maker-mc";

const ONLY_BCS: &str = "processOnlyBCs";

const PROCESS_CHOICES: &[&str] = &[
    "Full",
    "FullTiny",
    "FullWithCov",
    "FullWithCent",
    "BarrelOnly",
    "BarrelOnlyWithCov",
    "BarrelOnlyWithV0Bits",
    "BarrelOnlyWithEventFilter",
    "BarrelOnlyWithQvector",
    "BarrelOnlyWithCent",
    "MuonOnly",
    "MuonOnlyWithCov",
    "MuonOnlyWithCent",
    "MuonOnlyWithQvector",
    "MuonOnlyWithFilter",
    "OnlyBCs",
];

const PID_CHOICES: &[&str] = &["el", "mu", "pi", "ka", "pr", "de", "tr", "he", "al"];

const EST_CHOICES: &[&str] = &[
    "Run2V0M",
    "Run2SPDtks",
    "Run2SPDcls",
    "Run2CL0",
    "Run2CL1",
    "FV0A",
    "FT0M",
    "FDDM",
    "NTPV",
];

const AXES: &[AxisSpec] = &[
    AxisSpec::affixed("process", "process", "", PROCESS_CHOICES),
    AxisSpec::affixed("pid", "pid-", "", PID_CHOICES),
    AxisSpec::affixed("est", "est", "", EST_CHOICES),
];

const fn process(parameter: &'static str) -> SwitchRule {
    SwitchRule::canonical("process", parameter)
}

const fn pid(parameter: &'static str) -> SwitchRule {
    SwitchRule::canonical("pid", parameter)
        .counter()
        .in_scope(StageScope::Except("tof-pid"))
}

const fn est(parameter: &'static str) -> SwitchRule {
    SwitchRule::canonical("est", parameter).counter()
}

const SWITCHES: &[SwitchRule] = &[
    process("processFull"),
    process("processFullTiny"),
    process("processFullWithCov"),
    process("processFullWithCent"),
    process("processBarrelOnly"),
    process("processBarrelOnlyWithCov"),
    process("processBarrelOnlyWithV0Bits"),
    process("processBarrelOnlyWithEventFilter"),
    process("processBarrelOnlyWithQvector"),
    process("processBarrelOnlyWithCent"),
    process("processMuonOnly"),
    process("processMuonOnlyWithCov"),
    process("processMuonOnlyWithCent"),
    process("processMuonOnlyWithQvector"),
    process("processMuonOnlyWithFilter"),
    process(ONLY_BCS).always_true(),
    pid("pid-el"),
    pid("pid-mu"),
    pid("pid-pi"),
    pid("pid-ka"),
    pid("pid-pr"),
    pid("pid-de"),
    pid("pid-tr"),
    pid("pid-he"),
    pid("pid-al"),
    est("estRun2V0M"),
    est("estRun2SPDtks"),
    est("estRun2SPDcls"),
    est("estRun2CL0"),
    est("estRun2CL1"),
    est("estFV0A"),
    est("estFT0M"),
    est("estFDDM"),
    est("estNTPV"),
];

const CHOICES: &[ChoiceGroup] = &[
    ChoiceGroup {
        option: "FT0",
        scope: StageScope::Only("tof-event-time"),
        encoding: Encoding::Boolean,
        choices: &[
            ("FT0", "processFT0"),
            ("NoFT0", "processNoFT0"),
            ("OnlyFT0", "processOnlyFT0"),
            ("Run2", "processRun2"),
        ],
    },
    ChoiceGroup {
        option: "isVertexZeq",
        scope: StageScope::Any,
        encoding: Encoding::Binary,
        choices: &[("true", "doVertexZeq"), ("false", "doDummyZeq")],
    },
    ChoiceGroup {
        option: "isWSlice",
        scope: StageScope::Any,
        encoding: Encoding::Boolean,
        choices: &[("true", "processWSlice"), ("false", "processWoSlice")],
    },
    ChoiceGroup {
        option: "isCovariance",
        scope: StageScope::Any,
        encoding: Encoding::Boolean,
        choices: &[("false", "processStandard"), ("true", "processCovariance")],
    },
];

const BINDINGS: &[OptionBinding] = &[
    OptionBinding::single("aod", "aod-file"),
    OptionBinding::multi("cfgEventCuts", "cfgEventCuts"),
    OptionBinding::multi("cfgBarrelTrackCuts", "cfgBarrelTrackCuts"),
    OptionBinding::multi("cfgMuonCuts", "cfgMuonCuts"),
    OptionBinding::single("cfgBarrelLowPt", "cfgBarrelLowPt"),
    OptionBinding::single("cfgMuonLowPt", "cfgMuonLowPt"),
    OptionBinding::single("cfgNoQA", "cfgNoQA"),
    OptionBinding::single("cfgDetailedQA", "cfgDetailedQA"),
    OptionBinding::single("cfgMinTpcSignal", "cfgMinTpcSignal"),
    OptionBinding::single("cfgMaxTpcSignal", "cfgMaxTpcSignal"),
    OptionBinding::multi("cfgMCsignals", "cfgMCsignals"),
    OptionBinding::single("syst", "syst"),
    OptionBinding::single("muonSelection", "muonSelection"),
    OptionBinding::single("customDeltaBC", "customDeltaBC"),
    OptionBinding::single("tof-expreso", "tof-expreso"),
    OptionBinding::single("itsMatching", "itsMatching"),
];

const REQUIRES_ONLY_BCS: &[(&str, &str)] = &[(TASK_STAGE, ONLY_BCS)];

const fn needs_bcs(flag: &'static str) -> FlagRule {
    FlagRule {
        stage: TASK_STAGE,
        flag,
        companions: REQUIRES_ONLY_BCS,
    }
}

const FLAG_RULES: &[FlagRule] = &[
    needs_bcs("processFull"),
    needs_bcs("processFullTiny"),
    needs_bcs("processFullWithCov"),
    needs_bcs("processFullWithCent"),
    needs_bcs("processBarrelOnly"),
    needs_bcs("processBarrelOnlyWithCov"),
    needs_bcs("processBarrelOnlyWithV0Bits"),
    needs_bcs("processBarrelOnlyWithEventFilter"),
    needs_bcs("processBarrelOnlyWithQvector"),
    needs_bcs("processBarrelOnlyWithCent"),
    needs_bcs("processMuonOnly"),
    needs_bcs("processMuonOnlyWithCov"),
    needs_bcs("processMuonOnlyWithCent"),
    needs_bcs("processMuonOnlyWithQvector"),
    needs_bcs("processMuonOnlyWithFilter"),
];

const IMPLICATIONS: &[Implication] = &[Implication {
    trigger: Trigger::AxisPresent("process"),
    axis: "process",
    member: ONLY_BCS,
}];

const FORBIDDEN: &[ForbiddenCombination] = &[ForbiddenCombination {
    axis: "process",
    member_contains: "Cent",
    option: "syst",
    fallback: ("event-selection-task", "syst"),
    forbidden: "pp",
    reason: "centrality tables are not produced for pp collisions",
}];

/// Rule tables of the table-maker-mc workflow
pub static RULES: RuleSet = RuleSet {
    name: "table-maker-mc",
    axes: AXES,
    switches: SWITCHES,
    choices: CHOICES,
    bindings: BINDINGS,
    flag_rules: FLAG_RULES,
    selection_rules: &[],
    implications: IMPLICATIONS,
    derivations: &[],
    closures: &[],
    dummies: &[],
    forbidden: FORBIDDEN,
};

const BARREL: Umbrella = Umbrella {
    family: "barrel",
    patterns: &["processFull", "processBarrel"],
    dependencies: &[
        "o2-analysis-trackselection",
        "o2-analysis-trackextension",
        "o2-analysis-pid-tof-base",
        "o2-analysis-pid-tof",
        "o2-analysis-pid-tof-full",
        "o2-analysis-pid-tof-beta",
        "o2-analysis-pid-tpc-full",
    ],
    tables: &["ReducedTracks", "ReducedTracksBarrel", "ReducedTracksBarrelPID"],
    simulation_tables: &["ReducedTracksBarrelLabels"],
};

const MUON: Umbrella = Umbrella {
    family: "muon",
    patterns: &["processFull", "processMuon"],
    dependencies: &[],
    tables: &["ReducedMuons", "ReducedMuonsExtra"],
    simulation_tables: &["ReducedMuonsLabels"],
};

const CENTRALITY: &str = "o2-analysis-centrality-table";
const FILTER_PP: &str = "o2-analysis-dq-filter-pp";

const LOOKUP: &[SwitchArtifacts] = &[
    SwitchArtifacts::skim("processFull", &[], &[]),
    SwitchArtifacts::skim("processFullTiny", &[], &[]),
    SwitchArtifacts::skim(
        "processFullWithCov",
        &[],
        &["ReducedTracksBarrelCov", "ReducedMuonsCov"],
    ),
    SwitchArtifacts::skim("processFullWithCent", &[CENTRALITY], &[]),
    SwitchArtifacts::skim("processBarrelOnly", &[], &[]),
    SwitchArtifacts::skim("processBarrelOnlyWithCov", &[], &["ReducedTracksBarrelCov"]),
    SwitchArtifacts::skim(
        "processBarrelOnlyWithV0Bits",
        &["o2-analysis-dq-v0-selector", "o2-analysis-weak-decay-indices"],
        &[],
    ),
    SwitchArtifacts::skim("processBarrelOnlyWithEventFilter", &[FILTER_PP], &[]),
    SwitchArtifacts::skim(
        "processBarrelOnlyWithQvector",
        &[CENTRALITY, "o2-analysis-dq-flow"],
        &["ReducedEventsQvector"],
    ),
    SwitchArtifacts::skim("processBarrelOnlyWithCent", &[CENTRALITY], &[]),
    SwitchArtifacts::skim("processMuonOnly", &[], &[]),
    SwitchArtifacts::skim("processMuonOnlyWithCov", &[], &["ReducedMuonsCov"]),
    SwitchArtifacts::skim("processMuonOnlyWithCent", &[CENTRALITY], &[]),
    SwitchArtifacts::skim(
        "processMuonOnlyWithQvector",
        &[CENTRALITY, "o2-analysis-dq-flow"],
        &["ReducedEventsQvector"],
    ),
    SwitchArtifacts::skim("processMuonOnlyWithFilter", &[FILTER_PP], &[]),
    SwitchArtifacts::bookkeeping(ONLY_BCS),
];

const fn location(name: &'static str, path: &'static str) -> TableLocation {
    TableLocation { name, path }
}

const LOCATIONS: &[TableLocation] = &[
    location("ReducedEvents", "AOD/REDUCEDEVENT/0"),
    location("ReducedEventsExtended", "AOD/REEXTENDED/0"),
    location("ReducedEventsVtxCov", "AOD/REVTXCOV/0"),
    location("ReducedEventsQvector", "AOD/REQVECTOR/0"),
    location("ReducedMCEventLabels", "AOD/REMCCOLLBL/0"),
    location("ReducedMCEvents", "AOD/REMC/0"),
    location("ReducedTracks", "AOD/REDUCEDTRACK/0"),
    location("ReducedTracksBarrel", "AOD/RTBARREL/0"),
    location("ReducedTracksBarrelCov", "AOD/RTBARRELCOV/0"),
    location("ReducedTracksBarrelPID", "AOD/RTBARRELPID/0"),
    location("ReducedTracksBarrelLabels", "AOD/RTBARRELLABELS/0"),
    location("ReducedMCTracks", "AOD/RTMC/0"),
    location("ReducedMuons", "AOD/RTMUON/0"),
    location("ReducedMuonsExtra", "AOD/RTMUONEXTRA/0"),
    location("ReducedMuonsCov", "AOD/RTMUONCOV/0"),
    location("ReducedMuonsLabels", "AOD/RTMUONSLABELS/0"),
];

/// Dependency and table lookup of the table-maker-mc workflow
pub static ARTIFACTS: ArtifactTables = ArtifactTables {
    task_stage: TASK_STAGE,
    switch_axis: "process",
    baseline_dependencies: &[
        "o2-analysis-timestamp",
        "o2-analysis-event-selection",
        "o2-analysis-multiplicity-table",
    ],
    baseline_tables: &["ReducedEvents", "ReducedEventsExtended", "ReducedEventsVtxCov"],
    simulation_tables: &["ReducedMCEvents", "ReducedMCEventLabels"],
    per_switch_simulation_tables: &["ReducedMCTracks"],
    umbrellas: &[BARREL, MUON],
    switches: LOOKUP,
    locations: LOCATIONS,
    replaced_by_propagation: "o2-analysis-trackextension",
};
