#![deny(warnings)]

//! Session runtime linking the costing, simulation and pricing models.
//!
//! A [`Session`] carries the last successful costing so that simulation and
//! pricing inputs can be pre-populated from it. Only the costing step writes
//! the carried value; the other steps read a copy. Sessions share nothing.

use crop_core::{
    validate_line_item, validate_other_costs, CostLineItem, PricingRequest, ProductionParameters,
    SimulationRequest, StageDescriptor, StageId, TriangularSpec, ValidationError,
};
use crop_econ::{
    aggregate_stage, compute_costing, CostingError, CostingResult, PricingError, PricingResult,
    ScenarioSummary, SimulationError, StageCostResult,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub mod defaults;

pub use defaults::{PricingOverrides, ProductionOverrides, SimulationOverrides};
use defaults::*;

/// Errors surfaced by a session step.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("costing failed: {0}")]
    Costing(#[from] CostingError),
    #[error("simulation rejected: {0}")]
    Simulation(#[from] SimulationError),
    #[error("pricing rejected: {0}")]
    Pricing(#[from] PricingError),
    #[error("stage {0:?} supplied more than once")]
    DuplicateStage(StageId),
    #[error("stage {0:?} missing")]
    MissingStage(StageId),
}

/// Quantity and unit cost entered for one item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemEntry {
    /// Name for entries beyond the catalogue; catalogue entries keep their name.
    pub name: Option<String>,
    pub sample_unit: Option<String>,
    pub quantity: f64,
    pub unit_cost: f64,
}

/// Items and miscellaneous costs entered for one stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageInput {
    pub stage: StageId,
    pub items: Vec<CostLineItem>,
    pub other_costs: f64,
}

impl StageInput {
    /// Pair entries with the descriptor's templates by position. Entries
    /// beyond the catalogue become extra named items; catalogue items with
    /// no entry count as zero.
    pub fn from_entries(descriptor: &StageDescriptor, entries: &[ItemEntry], other_costs: f64) -> Self {
        let n = descriptor.items.len().max(entries.len());
        let items = (0..n)
            .map(|i| {
                let entry = entries.get(i).cloned().unwrap_or_default();
                match descriptor.items.get(i) {
                    Some(template) => {
                        CostLineItem::from_template(template, entry.quantity, entry.unit_cost)
                    }
                    None => CostLineItem {
                        name: entry.name.unwrap_or_else(|| format!("Additional item {}", i + 1)),
                        sample_unit: entry.sample_unit.unwrap_or_else(|| "unit".to_string()),
                        quantity: entry.quantity,
                        unit_cost: entry.unit_cost,
                    },
                }
            })
            .collect();
        Self {
            stage: descriptor.id,
            items,
            other_costs,
        }
    }
}

/// A successful costing together with the production inputs behind it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarriedCosting {
    pub result: CostingResult,
    pub params: ProductionParameters,
}

/// Everything a costing step produced, for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostingRun {
    pub stages: Vec<StageCostResult>,
    pub result: CostingResult,
    pub params: ProductionParameters,
}

/// Per-user state between steps.
#[derive(Clone, Debug, Default)]
pub struct Session {
    last_costing: Option<CarriedCosting>,
}

fn aggregate_all(stages: Vec<StageInput>) -> Result<Vec<StageCostResult>, SessionError> {
    let mut ordered: [Option<StageInput>; 3] = [None, None, None];
    for input in stages {
        for item in &input.items {
            validate_line_item(item)?;
        }
        validate_other_costs(input.other_costs)?;
        let slot = input.stage.index();
        if ordered[slot].is_some() {
            return Err(SessionError::DuplicateStage(input.stage));
        }
        ordered[slot] = Some(input);
    }
    StageId::ALL
        .iter()
        .zip(ordered)
        .map(|(id, input)| {
            let input = input.ok_or(SessionError::MissingStage(*id))?;
            Ok(aggregate_stage(input.stage, input.items, input.other_costs))
        })
        .collect()
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last successful costing, if any.
    pub fn last_costing(&self) -> Option<&CarriedCosting> {
        self.last_costing.as_ref()
    }

    /// Production parameters: overrides, then the carried inputs, then the
    /// built-in defaults.
    pub fn production_parameters(&self, overrides: &ProductionOverrides) -> ProductionParameters {
        let carried = self.last_costing.map(|c| c.params);
        ProductionParameters {
            area_ha: overrides
                .area_ha
                .or(carried.map(|p| p.area_ha))
                .unwrap_or(DEFAULT_AREA_HA),
            yield_kg_per_ha: overrides
                .yield_kg_per_ha
                .or(carried.map(|p| p.yield_kg_per_ha))
                .unwrap_or(DEFAULT_YIELD_KG_HA),
            field_loss_pct: overrides
                .field_loss_pct
                .or(carried.map(|p| p.field_loss_pct))
                .unwrap_or(DEFAULT_FIELD_LOSS_PCT),
            processing_loss_pct: overrides
                .processing_loss_pct
                .or(carried.map(|p| p.processing_loss_pct))
                .unwrap_or(DEFAULT_PROCESSING_LOSS_PCT),
        }
    }

    /// Aggregate the three stages and derive the unit variable cost.
    ///
    /// On success the result replaces the carried costing. On failure,
    /// including zero sellable output, the carried costing is left as it was.
    pub fn run_costing(
        &mut self,
        stages: Vec<StageInput>,
        params: ProductionParameters,
    ) -> Result<CostingRun, SessionError> {
        let stages = aggregate_all(stages)?;
        let totals = [stages[0].total, stages[1].total, stages[2].total];
        let result = match compute_costing(totals, &params) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "costing not carried over");
                return Err(e.into());
            }
        };
        self.last_costing = Some(CarriedCosting { result, params });
        info!(
            total_variable_cost = result.total_variable_cost,
            final_sellable_kg = result.final_sellable_kg,
            unit_variable_cost = result.unit_variable_cost,
            "costing carried over"
        );
        Ok(CostingRun {
            stages,
            result,
            params,
        })
    }

    /// Simulation inputs pre-populated from the carried costing.
    pub fn simulation_request(&self, overrides: &SimulationOverrides) -> SimulationRequest {
        let carried = self.last_costing;
        let base_cost = carried
            .map(|c| c.result.unit_variable_cost)
            .unwrap_or(DEFAULT_UNIT_COST);
        let yield_mode = carried
            .map(|c| c.params.yield_kg_per_ha)
            .unwrap_or(DEFAULT_YIELD_KG_HA);
        SimulationRequest {
            samples: overrides.samples.unwrap_or(DEFAULT_SAMPLES),
            area_ha: overrides
                .area_ha
                .or(carried.map(|c| c.params.area_ha))
                .unwrap_or(DEFAULT_AREA_HA),
            yield_spec: overrides.yield_spec.unwrap_or(TriangularSpec {
                min: DEFAULT_YIELD_MIN_KG_HA,
                mode: yield_mode,
                max: DEFAULT_YIELD_MAX_KG_HA,
            }),
            price_spec: overrides.price_spec.unwrap_or(DEFAULT_PRICE_SPEC),
            cost_spec: overrides.cost_spec.unwrap_or_else(|| unit_cost_spec(base_cost)),
        }
    }

    /// Pricing inputs pre-populated from the carried costing.
    pub fn pricing_request(&self, overrides: &PricingOverrides) -> PricingRequest {
        let carried = self.last_costing;
        let carried_cost = if overrides.use_carried_unit_cost {
            carried.map(|c| c.result.unit_variable_cost)
        } else {
            None
        };
        PricingRequest {
            unit_variable_cost: overrides
                .unit_variable_cost
                .or(carried_cost)
                .unwrap_or(DEFAULT_UNIT_COST),
            fixed_costs_total: overrides.fixed_costs_total.unwrap_or(0.0),
            desired_profit_total: overrides.desired_profit_total.unwrap_or(0.0),
            forecast_volume_kg: overrides
                .forecast_volume_kg
                .or(carried.map(|c| c.result.final_sellable_kg))
                .unwrap_or(0.0),
            tax_pct: overrides.tax_pct.unwrap_or(0.0),
            variable_expense_pct: overrides.variable_expense_pct.unwrap_or(0.0),
        }
    }

    /// Run a simulation from the resolved inputs with the given random source.
    pub fn run_simulation<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        overrides: &SimulationOverrides,
    ) -> Result<ScenarioSummary, SessionError> {
        let request = self.simulation_request(overrides);
        Ok(crop_econ::simulate(rng, &request)?)
    }

    /// Run a simulation, reproducible when `seed` is given.
    pub fn run_simulation_seeded(
        &self,
        seed: Option<u64>,
        overrides: &SimulationOverrides,
    ) -> Result<ScenarioSummary, SessionError> {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.run_simulation(&mut rng, overrides)
    }

    /// Solve the sale price from the resolved inputs.
    pub fn run_pricing(&self, overrides: &PricingOverrides) -> Result<PricingResult, SessionError> {
        let request = self.pricing_request(overrides);
        Ok(crop_econ::solve(&request)?)
    }
}
