use dq_config::{ConfigDocument, Encoding, Switch};
use dq_engine::{
    run, ArtifactOptions, DependencyValidator, RawSelections, ResolutionMode, Resolver, Selections,
    Workflow,
};
use dq_test_utils::{
    shuffled_document, table_maker_mc_base, table_maker_mc_base_value, table_reader_base,
    table_reader_base_value,
};
use proptest::prelude::*;
use proptest::sample::subsequence;

fn axis_choices(workflow: Workflow, axis: &str) -> Vec<&'static str> {
    workflow
        .rules()
        .axis(axis)
        .map(|spec| spec.choices.to_vec())
        .unwrap_or_default()
}

fn mode_strategy() -> impl Strategy<Value = ResolutionMode> {
    prop_oneof![Just(ResolutionMode::Override), Just(ResolutionMode::Additive)]
}

fn maker_selections() -> impl Strategy<Value = RawSelections> {
    let process = axis_choices(Workflow::TableMakerMc, "process");
    let pid = axis_choices(Workflow::TableMakerMc, "pid");
    let est = axis_choices(Workflow::TableMakerMc, "est");
    (
        proptest::option::of(subsequence(process.clone(), 1..=process.len())),
        proptest::option::of(subsequence(pid.clone(), 1..=pid.len())),
        proptest::option::of(subsequence(est.clone(), 1..=est.len())),
        proptest::option::of(prop_oneof![Just("true"), Just("false")]),
        proptest::option::of(prop_oneof![Just("FT0"), Just("NoFT0"), Just("OnlyFT0"), Just("Run2")]),
        proptest::option::of(subsequence(vec!["eventStandard", "eventStandardNoINT7", "eventDimuon"], 1..=3)),
    )
        .prop_map(|(process, pid, est, toggle, ft0, cuts)| {
            let mut raw = RawSelections::new().option("syst", "PbPb");
            if let Some(values) = process {
                raw = raw.axis("process", values);
            }
            if let Some(values) = pid {
                raw = raw.axis("pid", values);
            }
            if let Some(values) = est {
                raw = raw.axis("est", values);
            }
            if let Some(value) = toggle {
                raw = raw
                    .option("isVertexZeq", value)
                    .option("isWSlice", value)
                    .option("isCovariance", value);
            }
            if let Some(value) = ft0 {
                raw = raw.option("FT0", value);
            }
            if let Some(values) = cuts {
                raw = raw.option_many("cfgEventCuts", values);
            }
            raw
        })
}

fn reader_selections() -> impl Strategy<Value = RawSelections> {
    let analysis = axis_choices(Workflow::TableReader, "analysis");
    let process = axis_choices(Workflow::TableReader, "process");
    (
        proptest::option::of(subsequence(analysis.clone(), 1..=analysis.len())),
        proptest::option::of(subsequence(process.clone(), 1..=process.len())),
        proptest::option::of(subsequence(vec!["jpsiPID1", "jpsiPID2", "jpsiO2MCdebugCuts"], 1..=3)),
    )
        .prop_map(|(analysis, process, cuts)| {
            let mut raw = RawSelections::new();
            if let Some(values) = analysis {
                raw = raw.axis("analysis", values);
            }
            if let Some(values) = process {
                raw = raw.axis("process", values);
            }
            if let Some(values) = cuts {
                raw = raw.option_many("cfgTrackCuts", values);
            }
            raw
        })
}

fn resolved(
    workflow: Workflow,
    mut doc: ConfigDocument,
    raw: &RawSelections,
    mode: ResolutionMode,
) -> Option<ConfigDocument> {
    let selections = Selections::normalize(raw, workflow.rules()).ok()?;
    Resolver::new(workflow.rules(), mode).resolve(&mut doc, &selections);
    Some(doc)
}

fn enabled(doc: &ConfigDocument, stage: &str, parameter: &str, encoding: Encoding) -> bool {
    doc.switch(stage, parameter, encoding) == Some(Switch::Enabled)
}

proptest! {
    #[test]
    fn prop_resolution_is_idempotent(raw in maker_selections(), mode in mode_strategy()) {
        let rules = Workflow::TableMakerMc.rules();
        let selections = Selections::normalize(&raw, rules).unwrap();
        let resolver = Resolver::new(rules, mode);

        let mut doc = table_maker_mc_base();
        resolver.resolve(&mut doc, &selections);
        let once = doc.clone();
        resolver.resolve(&mut doc, &selections);
        prop_assert_eq!(doc, once);
    }

    #[test]
    fn prop_reader_resolution_is_idempotent(raw in reader_selections(), mode in mode_strategy()) {
        let rules = Workflow::TableReader.rules();
        let selections = Selections::normalize(&raw, rules).unwrap();
        let resolver = Resolver::new(rules, mode);

        let mut doc = table_reader_base();
        resolver.resolve(&mut doc, &selections);
        let once = doc.clone();
        resolver.resolve(&mut doc, &selections);
        prop_assert_eq!(doc, once);
    }

    #[test]
    fn prop_visiting_order_is_irrelevant(
        raw in maker_selections(),
        mode in mode_strategy(),
        shuffled in shuffled_document(&table_maker_mc_base_value()),
    ) {
        let expected = resolved(Workflow::TableMakerMc, table_maker_mc_base(), &raw, mode).unwrap();
        let actual = resolved(Workflow::TableMakerMc, shuffled, &raw, mode).unwrap();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_reader_visiting_order_is_irrelevant(
        raw in reader_selections(),
        mode in mode_strategy(),
        shuffled in shuffled_document(&table_reader_base_value()),
    ) {
        let expected = resolved(Workflow::TableReader, table_reader_base(), &raw, mode).unwrap();
        let actual = resolved(Workflow::TableReader, shuffled, &raw, mode).unwrap();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_exclusive_groups_have_one_member_enabled(raw in maker_selections(), mode in mode_strategy()) {
        let rules = Workflow::TableMakerMc.rules();
        let selections = Selections::normalize(&raw, rules).unwrap();
        let mut doc = table_maker_mc_base();
        Resolver::new(rules, mode).resolve(&mut doc, &selections);

        for group in rules.choices {
            if selections.option(group.option).is_none() {
                continue;
            }
            for (stage_name, stage) in doc.stages() {
                if !group.scope.admits(stage_name) || !group.parameters().any(|p| stage.contains(p)) {
                    continue;
                }
                let count = group
                    .parameters()
                    .filter(|p| stage.switch(p, group.encoding) == Some(Switch::Enabled))
                    .count();
                prop_assert_eq!(count, 1, "{} in {}", group.option, stage_name);
            }
        }
    }

    #[test]
    fn prop_override_decides_every_exercised_switch(raw in maker_selections()) {
        let rules = Workflow::TableMakerMc.rules();
        let selections = Selections::normalize(&raw, rules).unwrap();
        let mut doc = table_maker_mc_base();
        Resolver::new(rules, ResolutionMode::Override).resolve(&mut doc, &selections);

        for (stage_name, stage) in doc.stages() {
            for (parameter, _) in stage.iter() {
                let Some(rule) = rules.switch_for(stage_name, parameter) else { continue };
                let Some(set) = selections.axis(rule.axis) else { continue };
                let expected = set.contains(rule.member) || rule.always_true;
                prop_assert_eq!(
                    enabled(&doc, stage_name, parameter, rule.encoding),
                    expected,
                    "[{}] {}", stage_name, parameter
                );
            }
        }
    }

    #[test]
    fn prop_accepted_runs_satisfy_every_flag_rule(raw in reader_selections(), mode in mode_strategy()) {
        let workflow = Workflow::TableReader;
        if let Ok(outcome) = run(workflow, table_reader_base(), &raw, mode, ArtifactOptions::default()) {
            for ((stage, flag), companions) in workflow.rules().companions() {
                if enabled(&outcome.document, stage, flag, Encoding::Boolean) {
                    for (companion_stage, companion) in companions {
                        prop_assert!(enabled(&outcome.document, companion_stage, companion, Encoding::Boolean));
                    }
                }
            }
            prop_assert!(DependencyValidator::new(workflow.rules())
                .validate(&outcome.document, &outcome.selections)
                .is_ok());
        }
    }

    #[test]
    fn prop_artifacts_grow_with_enabled_switches(
        first in subsequence(axis_choices(Workflow::TableMakerMc, "process"), 0..=8),
        extra in subsequence(axis_choices(Workflow::TableMakerMc, "process"), 0..=8),
        simulation in any::<bool>(),
        track_propagation in any::<bool>(),
    ) {
        let tables = Workflow::TableMakerMc.artifact_tables().unwrap();
        let options = ArtifactOptions { simulation, track_propagation };
        let axis = Workflow::TableMakerMc.rules().axis("process").unwrap();

        let mut small = table_maker_mc_base();
        let mut large = table_maker_mc_base();
        for stage in [&mut small, &mut large] {
            let task = stage.stage_mut("table-maker-m-c").unwrap();
            for name in task.parameter_names() {
                if name.starts_with("process") {
                    task.set_switch(&name, Switch::Disabled, Encoding::Boolean);
                }
            }
        }
        for raw in &first {
            let name = axis.canonical(raw);
            small.stage_mut("table-maker-m-c").unwrap().set_switch(&name, Switch::Enabled, Encoding::Boolean);
            large.stage_mut("table-maker-m-c").unwrap().set_switch(&name, Switch::Enabled, Encoding::Boolean);
        }
        for raw in &extra {
            let name = axis.canonical(raw);
            large.stage_mut("table-maker-m-c").unwrap().set_switch(&name, Switch::Enabled, Encoding::Boolean);
        }

        let small = tables.build(&small, options);
        let large = tables.build(&large, options);
        prop_assert!(small.dependencies.is_subset(&large.dependencies));
        prop_assert!(small.tables.is_subset(&large.tables));
        prop_assert!(small.families.is_subset(&large.families));
    }
}
