//! YAML scenario input: stage entries, production inputs and overrides.

use anyhow::{Context, Result};
use crop_core::{StageDescriptor, StageId};
use crop_runtime::{ItemEntry, PricingOverrides, ProductionOverrides, SimulationOverrides, StageInput};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Entries of one stage, matched to catalogue items by position.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StageEntry {
    pub items: Vec<ItemEntry>,
    pub other_costs: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StageEntries {
    pub establishment: StageEntry,
    pub maintenance: StageEntry,
    pub harvest: StageEntry,
}

impl StageEntries {
    fn get(&self, id: StageId) -> &StageEntry {
        match id {
            StageId::Establishment => &self.establishment,
            StageId::Maintenance => &self.maintenance,
            StageId::Harvest => &self.harvest,
        }
    }
}

/// Everything the CLI reads from a scenario file. Every field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub stages: StageEntries,
    pub production: ProductionOverrides,
    pub simulation: SimulationOverrides,
    pub pricing: PricingOverrides,
    /// Seed for reproducible simulations; omitted means entropy-seeded.
    pub seed: Option<u64>,
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid scenario YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// One input per catalogue stage, in catalogue order.
    pub fn stage_inputs(&self, catalogue: &[StageDescriptor]) -> Vec<StageInput> {
        catalogue
            .iter()
            .map(|d| {
                let entry = self.stages.get(d.id);
                StageInput::from_entries(d, &entry.items, entry.other_costs)
            })
            .collect()
    }
}
