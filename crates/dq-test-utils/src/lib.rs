//! Testing utilities for the dqflow workspace
//!
//! Shared base documents, proptest strategies and scratch directories.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use dq_config::ConfigDocument;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// Base document of the table-maker-mc workflow
pub fn table_maker_mc_base_value() -> Value {
    json!({
        "internal-dpl-clock": "",
        "internal-dpl-aod-reader": {
            "aod-file": "AO2D.root",
            "time-limit": "0"
        },
        "timestamp-task": {"verbose": "false"},
        "event-selection-task": {
            "syst": "pp",
            "muonSelection": "0",
            "customDeltaBC": "300",
            "isMC": "true"
        },
        "multiplicity-table": {
            "doVertexZeq": "1",
            "doDummyZeq": "0"
        },
        "table-maker-m-c": {
            "cfgEventCuts": "eventStandard",
            "cfgBarrelTrackCuts": "jpsiPID1",
            "cfgMuonCuts": "muonQualityCuts",
            "cfgBarrelLowPt": "1.0",
            "cfgMuonLowPt": "1.0",
            "cfgNoQA": "false",
            "cfgDetailedQA": "false",
            "cfgMinTpcSignal": "30.0",
            "cfgMaxTpcSignal": "300.0",
            "cfgMCsignals": ["eFromJpsi", "muFromJpsi"],
            "processFull": "false",
            "processFullTiny": "false",
            "processFullWithCov": "false",
            "processFullWithCent": "false",
            "processBarrelOnly": "false",
            "processBarrelOnlyWithCov": "false",
            "processBarrelOnlyWithV0Bits": "false",
            "processBarrelOnlyWithEventFilter": "false",
            "processBarrelOnlyWithQvector": "false",
            "processBarrelOnlyWithCent": "false",
            "processMuonOnly": "true",
            "processMuonOnlyWithCov": "false",
            "processMuonOnlyWithCent": "false",
            "processMuonOnlyWithQvector": "false",
            "processMuonOnlyWithFilter": "false",
            "processOnlyBCs": "true"
        },
        "tof-pid": {
            "pid-el": "-1",
            "pid-mu": "-1",
            "pid-pi": "-1",
            "pid-ka": "-1",
            "pid-pr": "-1"
        },
        "tpc-pid-full": {
            "pid-el": "-1",
            "pid-mu": "-1",
            "pid-pi": "1",
            "pid-ka": "-1",
            "pid-pr": "-1",
            "pid-de": "-1",
            "pid-tr": "-1",
            "pid-he": "-1",
            "pid-al": "-1"
        },
        "tof-pid-full": {
            "pid-el": "-1",
            "pid-pi": "-1",
            "processWSlice": "true",
            "processWoSlice": "false"
        },
        "centrality-table": {
            "estRun2V0M": "-1",
            "estRun2SPDtks": "-1",
            "estRun2SPDcls": "-1",
            "estRun2CL0": "-1",
            "estRun2CL1": "-1",
            "estFV0A": "-1",
            "estFT0M": "1",
            "estFDDM": "-1",
            "estNTPV": "-1"
        },
        "tof-event-time": {
            "processFT0": "false",
            "processNoFT0": "false",
            "processOnlyFT0": "true",
            "processRun2": "false"
        },
        "tof-signal": {"tof-expreso": "0"},
        "track-propagation": {
            "processStandard": "true",
            "processCovariance": "false"
        }
    })
}

/// Base document of the table-maker-mc workflow
pub fn table_maker_mc_base() -> ConfigDocument {
    ConfigDocument::from_value(table_maker_mc_base_value()).unwrap()
}

/// Base document of the table-reader workflow
pub fn table_reader_base_value() -> Value {
    json!({
        "internal-dpl-clock": "",
        "internal-dpl-aod-reader": {
            "aod-file": "reducedAod.root",
            "aod-reader-json": "configs/readerConfiguration_reducedEvent.json"
        },
        "analysis-event-selection": {
            "cfgMixingVars": "Centrality3",
            "cfgEventCuts": "eventStandard",
            "cfgQA": "true",
            "processSkimmed": "true",
            "processDummy": "false"
        },
        "analysis-track-selection": {
            "cfgTrackCuts": "jpsiPID1,jpsiPID2",
            "cfgQA": "true",
            "processSkimmed": "true",
            "processDummy": "false"
        },
        "analysis-muon-selection": {
            "cfgMuonCuts": "muonQualityCuts",
            "cfgQA": "true",
            "processSkimmed": "false",
            "processDummy": "true"
        },
        "analysis-event-mixing": {
            "processBarrelSkimmed": "true",
            "processMuonSkimmed": "false",
            "processBarrelMuonSkimmed": "false",
            "processBarrelVnSkimmed": "false",
            "processMuonVnSkimmed": "false",
            "processDummy": "false"
        },
        "analysis-same-event-pairing": {
            "processJpsiToEESkimmed": "true",
            "processJpsiToMuMuSkimmed": "false",
            "processJpsiToMuMuVertexingSkimmed": "false",
            "processVnJpsiToEESkimmed": "false",
            "processVnJpsiToMuMuSkimmed": "false",
            "processElectronMuonSkimmed": "false",
            "processAllSkimmed": "false",
            "processDummy": "false"
        },
        "analysis-dilepton-hadron": {
            "cfgLeptonCuts": "jpsiPID1",
            "processSkimmed": "false",
            "processDummy": "true"
        }
    })
}

/// Base document of the table-reader workflow
pub fn table_reader_base() -> ConfigDocument {
    ConfigDocument::from_value(table_reader_base_value()).unwrap()
}

/// Same document with stages and parameters inserted in shuffled order
pub fn shuffled_document(value: &Value) -> impl Strategy<Value = ConfigDocument> {
    let stages: Vec<(String, Value)> = value
        .as_object()
        .map(|object| object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let per_stage: Vec<_> = stages
        .into_iter()
        .map(|(name, stage)| {
            let params: Vec<(String, Value)> = match &stage {
                Value::Object(object) => object.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                _ => Vec::new(),
            };
            let is_object = stage.is_object();
            Just(params)
                .prop_shuffle()
                .prop_map(move |params| {
                    let shuffled = if is_object {
                        Value::Object(params.into_iter().collect::<Map<String, Value>>())
                    } else {
                        stage.clone()
                    };
                    (name.clone(), shuffled)
                })
        })
        .collect();

    per_stage.prop_shuffle().prop_map(|stages| {
        let root: Map<String, Value> = stages.into_iter().collect();
        ConfigDocument::from_value(Value::Object(root)).unwrap()
    })
}

/// Scratch directory holding a base configuration file
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a JSON value to a file in the workspace
    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    /// Create an empty file, e.g. an AOD placeholder
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, "").unwrap();
        path
    }

    /// Read a JSON file written into the workspace
    pub fn read_json(&self, name: &str) -> Value {
        let text = std::fs::read_to_string(self.dir.path().join(name)).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
