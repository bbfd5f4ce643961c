//! Derived-artifact builder
//!
//! Reads the resolved process switches of the task stage and derives what
//! the run needs around the main executable:
//!
//! ```text
//!   enabled switches ──► dependencies   (executables piped after the task)
//!                   ├──► tables         (what the skim writes)
//!                   └──► descriptors    (writer/reader JSON for the tables)
//! ```
//!
//! All outputs keep insertion order and hold each entry once.

use dq_config::{ConfigDocument, Encoding, Switch};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RuleTableError;
use crate::rules::RuleSet;

/// Storage location of an output table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLocation {
    /// Table name
    pub name: &'static str,
    /// `AOD/...` storage path
    pub path: &'static str,
}

/// Artifacts shared by every switch of a detector family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Umbrella {
    /// Family name
    pub family: &'static str,
    /// Switch name prefixes belonging to the family
    pub patterns: &'static [&'static str],
    /// Executables the family needs
    pub dependencies: &'static [&'static str],
    /// Tables the family writes
    pub tables: &'static [&'static str],
    /// Truth tables written on simulated input
    pub simulation_tables: &'static [&'static str],
}

impl Umbrella {
    /// Check if a switch belongs to the family
    #[must_use]
    pub fn covers(&self, switch: &str) -> bool {
        self.patterns.iter().any(|pattern| switch.contains(pattern))
    }
}

/// Lookup entry of one process switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchArtifacts {
    /// Process switch
    pub switch: &'static str,
    /// Executables the switch needs
    pub dependencies: &'static [&'static str],
    /// Tables the switch writes
    pub tables: &'static [&'static str],
    /// Whether the switch writes skimmed objects and their truth tables
    pub skims: bool,
}

impl SwitchArtifacts {
    /// Entry of a switch producing skimmed output
    #[must_use]
    pub const fn skim(
        switch: &'static str,
        dependencies: &'static [&'static str],
        tables: &'static [&'static str],
    ) -> Self {
        Self {
            switch,
            dependencies,
            tables,
            skims: true,
        }
    }

    /// Entry of a switch with no artifacts of its own
    #[must_use]
    pub const fn bookkeeping(switch: &'static str) -> Self {
        Self {
            switch,
            dependencies: &[],
            tables: &[],
            skims: false,
        }
    }
}

/// Dependency and table lookup of a workflow
#[derive(Debug, Clone, Copy)]
pub struct ArtifactTables {
    /// Stage holding the process switches
    pub task_stage: &'static str,
    /// Axis whose switches are looked up
    pub switch_axis: &'static str,
    /// Executables every run needs
    pub baseline_dependencies: &'static [&'static str],
    /// Tables every run writes
    pub baseline_tables: &'static [&'static str],
    /// Truth tables written on simulated input
    pub simulation_tables: &'static [&'static str],
    /// Truth tables added by every skimming switch
    pub per_switch_simulation_tables: &'static [&'static str],
    /// Detector families
    pub umbrellas: &'static [Umbrella],
    /// Per-switch lookup
    pub switches: &'static [SwitchArtifacts],
    /// Storage path of every table
    pub locations: &'static [TableLocation],
    /// Dependency dropped when track propagation runs instead
    pub replaced_by_propagation: &'static str,
}

/// Flags influencing artifact derivation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactOptions {
    /// Input is simulated; truth tables are written
    pub simulation: bool,
    /// Track propagation executable is appended to the command
    pub track_propagation: bool,
}

/// Derived artifacts of a resolved document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    /// Executables piped after the main one
    pub dependencies: IndexSet<String>,
    /// Tables written by the run
    pub tables: IndexSet<String>,
    /// Active detector families
    pub families: IndexSet<String>,
    descriptors: Vec<TableDescriptor>,
}

/// One table entry in a reader or writer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Storage path
    pub table: String,
    /// Output tree name
    pub treename: String,
}

/// `OutputDirector` section of the writer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDirector {
    /// Debug output of the writer
    pub debugmode: bool,
    /// Output file name
    pub resfile: String,
    /// File open mode
    pub resfilemode: String,
    /// Time frames merged per file
    pub ntfmerge: u32,
    /// Tables to write
    #[serde(rename = "OutputDescriptors")]
    pub output_descriptors: Vec<TableDescriptor>,
}

/// Writer descriptor document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterDescriptor {
    /// Output section
    #[serde(rename = "OutputDirector")]
    pub output_director: OutputDirector,
}

/// `InputDirector` section of the reader descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDirector {
    /// Debug output of the reader
    pub debugmode: bool,
    /// Tables to read
    #[serde(rename = "InputDescriptors")]
    pub input_descriptors: Vec<TableDescriptor>,
}

/// Reader descriptor document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderDescriptor {
    /// Input section
    #[serde(rename = "InputDirector")]
    pub input_director: InputDirector,
}

impl ArtifactTables {
    /// Lookup entry of a switch
    #[must_use]
    pub fn lookup(&self, switch: &str) -> Option<&SwitchArtifacts> {
        self.switches.iter().find(|entry| entry.switch == switch)
    }

    /// Storage location of a table
    #[must_use]
    pub fn location(&self, table: &str) -> Option<&TableLocation> {
        self.locations.iter().find(|location| location.name == table)
    }

    /// Validate the lookup against a rule set
    ///
    /// Every switch of the looked-up axis needs an entry, and every table
    /// that can be produced needs a location.
    ///
    /// # Errors
    /// Returns `MissingLookupEntry` or `MissingTableLocation`
    pub fn check(&self, rules: &RuleSet) -> Result<(), RuleTableError> {
        let switches = rules
            .switches
            .iter()
            .filter(|rule| rule.axis == self.switch_axis);
        for rule in switches {
            if self.lookup(rule.parameter).is_none() {
                return Err(RuleTableError::MissingLookupEntry {
                    rules: rules.name.to_string(),
                    parameter: rule.parameter.to_string(),
                });
            }
        }

        let mut tables: Vec<&str> = Vec::new();
        tables.extend(self.baseline_tables);
        tables.extend(self.simulation_tables);
        tables.extend(self.per_switch_simulation_tables);
        for umbrella in self.umbrellas {
            tables.extend(umbrella.tables);
            tables.extend(umbrella.simulation_tables);
        }
        for entry in self.switches {
            tables.extend(entry.tables);
        }
        match tables.into_iter().find(|table| self.location(table).is_none()) {
            Some(table) => Err(RuleTableError::MissingTableLocation {
                rules: rules.name.to_string(),
                table: table.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Derive dependencies, tables and descriptors from a resolved document
    ///
    /// Switches are visited in lookup order; a switch the task stage does
    /// not declare is skipped.
    #[must_use]
    pub fn build(&self, doc: &ConfigDocument, options: ArtifactOptions) -> Artifacts {
        let mut artifacts = Artifacts::default();
        for dependency in self.baseline_dependencies {
            self.add_dependency(&mut artifacts, dependency, options);
        }
        artifacts.tables.extend(self.baseline_tables.iter().map(|t| (*t).to_string()));
        if options.simulation {
            artifacts
                .tables
                .extend(self.simulation_tables.iter().map(|t| (*t).to_string()));
        }

        for entry in self.switches {
            if doc.switch(self.task_stage, entry.switch, Encoding::Boolean) != Some(Switch::Enabled) {
                continue;
            }
            debug!(switch = entry.switch, "collecting artifacts");

            for umbrella in self.umbrellas.iter().filter(|u| u.covers(entry.switch)) {
                artifacts.families.insert(umbrella.family.to_string());
                for dependency in umbrella.dependencies {
                    self.add_dependency(&mut artifacts, dependency, options);
                }
                artifacts.tables.extend(umbrella.tables.iter().map(|t| (*t).to_string()));
                if options.simulation {
                    artifacts
                        .tables
                        .extend(umbrella.simulation_tables.iter().map(|t| (*t).to_string()));
                }
            }
            for dependency in entry.dependencies {
                self.add_dependency(&mut artifacts, dependency, options);
            }
            if options.simulation && entry.skims {
                artifacts
                    .tables
                    .extend(self.per_switch_simulation_tables.iter().map(|t| (*t).to_string()));
            }
            artifacts.tables.extend(entry.tables.iter().map(|t| (*t).to_string()));
        }

        if options.track_propagation {
            info!(
                "{} replaced by track propagation",
                self.replaced_by_propagation
            );
        }

        artifacts.descriptors = artifacts
            .tables
            .iter()
            .filter_map(|table| self.location(table))
            .map(|location| TableDescriptor {
                table: location.path.to_string(),
                treename: location.name.to_string(),
            })
            .collect();
        artifacts
    }

    fn add_dependency(&self, artifacts: &mut Artifacts, dependency: &str, options: ArtifactOptions) {
        if options.track_propagation && dependency == self.replaced_by_propagation {
            return;
        }
        artifacts.dependencies.insert(dependency.to_string());
    }
}

impl Artifacts {
    /// Table entries in production order
    #[must_use]
    pub fn descriptors(&self) -> &[TableDescriptor] {
        &self.descriptors
    }

    /// Check if a detector family is active
    #[must_use]
    pub fn has_family(&self, family: &str) -> bool {
        self.families.contains(family)
    }

    /// Writer descriptor for the produced tables
    #[must_use]
    pub fn writer_descriptor(&self) -> WriterDescriptor {
        WriterDescriptor {
            output_director: OutputDirector {
                debugmode: true,
                resfile: "reducedAod".to_string(),
                resfilemode: "RECREATE".to_string(),
                ntfmerge: 1,
                output_descriptors: self.descriptors.clone(),
            },
        }
    }

    /// Reader descriptor for the produced tables
    #[must_use]
    pub fn reader_descriptor(&self) -> ReaderDescriptor {
        ReaderDescriptor {
            input_director: InputDirector {
                debugmode: true,
                input_descriptors: self.descriptors.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::table_maker_mc::{ARTIFACTS, TASK_STAGE};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn with_switches(enabled: &[&str]) -> ConfigDocument {
        let mut stage = serde_json::Map::new();
        for entry in ARTIFACTS.switches {
            let value = if enabled.contains(&entry.switch) { "true" } else { "false" };
            stage.insert(entry.switch.to_string(), json!(value));
        }
        let mut root = serde_json::Map::new();
        root.insert(TASK_STAGE.to_string(), serde_json::Value::Object(stage));
        ConfigDocument::from_value(serde_json::Value::Object(root)).unwrap()
    }

    const MC: ArtifactOptions = ArtifactOptions {
        simulation: true,
        track_propagation: false,
    };

    #[test]
    fn baseline_only_when_nothing_enabled() {
        let artifacts = ARTIFACTS.build(&with_switches(&[]), ArtifactOptions::default());
        let deps: Vec<&str> = artifacts.dependencies.iter().map(String::as_str).collect();
        assert_eq!(
            deps,
            vec![
                "o2-analysis-timestamp",
                "o2-analysis-event-selection",
                "o2-analysis-multiplicity-table"
            ]
        );
        assert_eq!(artifacts.tables.len(), 3);
        assert!(artifacts.families.is_empty());
    }

    #[test]
    fn barrel_switch_pulls_barrel_umbrella() {
        let artifacts = ARTIFACTS.build(&with_switches(&["processBarrelOnlyWithV0Bits"]), MC);
        assert!(artifacts.dependencies.contains("o2-analysis-trackextension"));
        assert!(artifacts.dependencies.contains("o2-analysis-dq-v0-selector"));
        assert!(artifacts.has_family("barrel"));
        assert!(!artifacts.has_family("muon"));
        assert!(artifacts.tables.contains("ReducedTracksBarrelLabels"));
        assert!(artifacts.tables.contains("ReducedMCTracks"));
        assert!(!artifacts.tables.contains("ReducedMuons"));
    }

    #[test]
    fn full_switch_activates_both_families_in_order() {
        let artifacts = ARTIFACTS.build(&with_switches(&["processFullWithCov"]), MC);
        let tables: Vec<&str> = artifacts.tables.iter().map(String::as_str).collect();
        assert_eq!(
            tables,
            vec![
                "ReducedEvents",
                "ReducedEventsExtended",
                "ReducedEventsVtxCov",
                "ReducedMCEvents",
                "ReducedMCEventLabels",
                "ReducedTracks",
                "ReducedTracksBarrel",
                "ReducedTracksBarrelPID",
                "ReducedTracksBarrelLabels",
                "ReducedMuons",
                "ReducedMuonsExtra",
                "ReducedMuonsLabels",
                "ReducedMCTracks",
                "ReducedTracksBarrelCov",
                "ReducedMuonsCov",
            ]
        );
    }

    #[test]
    fn shared_dependencies_listed_once() {
        let artifacts = ARTIFACTS.build(
            &with_switches(&["processBarrelOnlyWithCent", "processMuonOnlyWithQvector"]),
            MC,
        );
        let centrality = artifacts
            .dependencies
            .iter()
            .filter(|d| *d == "o2-analysis-centrality-table")
            .count();
        assert_eq!(centrality, 1);
        assert!(artifacts.dependencies.contains("o2-analysis-dq-flow"));
    }

    #[test]
    fn track_propagation_drops_track_extension() {
        let options = ArtifactOptions {
            simulation: true,
            track_propagation: true,
        };
        let artifacts = ARTIFACTS.build(&with_switches(&["processBarrelOnly"]), options);
        assert!(!artifacts.dependencies.contains("o2-analysis-trackextension"));
        assert!(artifacts.dependencies.contains("o2-analysis-trackselection"));
    }

    #[test]
    fn bookkeeping_switch_adds_nothing() {
        let artifacts = ARTIFACTS.build(&with_switches(&["processOnlyBCs"]), MC);
        assert!(!artifacts.tables.contains("ReducedMCTracks"));
        assert_eq!(artifacts.dependencies.len(), 3);
    }

    #[test]
    fn descriptors_follow_table_order() {
        let artifacts = ARTIFACTS.build(&with_switches(&["processMuonOnlyWithCov"]), MC);
        let writer = serde_json::to_value(artifacts.writer_descriptor()).unwrap();
        let reader = serde_json::to_value(artifacts.reader_descriptor()).unwrap();

        assert_eq!(writer["OutputDirector"]["resfile"], "reducedAod");
        assert_eq!(writer["OutputDirector"]["ntfmerge"], 1);
        assert_eq!(
            writer["OutputDirector"]["OutputDescriptors"][0],
            json!({"table": "AOD/REDUCEDEVENT/0", "treename": "ReducedEvents"})
        );
        assert_eq!(
            writer["OutputDirector"]["OutputDescriptors"],
            reader["InputDirector"]["InputDescriptors"]
        );
        assert_eq!(artifacts.descriptors().len(), artifacts.tables.len());
    }

    #[test]
    fn missing_lookup_entry_detected() {
        let broken = ArtifactTables {
            switches: &[],
            ..ARTIFACTS
        };
        let err = broken.check(&crate::tables::table_maker_mc::RULES).unwrap_err();
        assert!(matches!(err, RuleTableError::MissingLookupEntry { .. }));
    }
}
