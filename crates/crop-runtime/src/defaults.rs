//! Default inputs and user overrides.
//!
//! Every default is resolved through an explicit `Option`; a carried or
//! overridden zero is a real value, never "unset".

use crop_core::TriangularSpec;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AREA_HA: f64 = 1.0;
pub const DEFAULT_YIELD_KG_HA: f64 = 20_000.0;
pub const DEFAULT_FIELD_LOSS_PCT: f64 = 5.0;
pub const DEFAULT_PROCESSING_LOSS_PCT: f64 = 20.0;

pub const DEFAULT_SAMPLES: u32 = 10_000;
pub const DEFAULT_YIELD_MIN_KG_HA: f64 = 15_000.0;
pub const DEFAULT_YIELD_MAX_KG_HA: f64 = 25_000.0;
pub const DEFAULT_PRICE_SPEC: TriangularSpec = TriangularSpec {
    min: 2.0,
    mode: 2.5,
    max: 3.0,
};

/// Unit variable cost assumed when no costing has been carried over.
pub const DEFAULT_UNIT_COST: f64 = 1.5;
/// Simulated unit cost spans these multiples of the base unit cost.
pub const UNIT_COST_LOW_FACTOR: f64 = 0.8;
pub const UNIT_COST_HIGH_FACTOR: f64 = 1.2;

/// Triangular unit cost spread around a base cost, floored at zero.
pub fn unit_cost_spec(base: f64) -> TriangularSpec {
    TriangularSpec {
        min: (base * UNIT_COST_LOW_FACTOR).max(0.0),
        mode: base,
        max: base * UNIT_COST_HIGH_FACTOR,
    }
}

/// Explicit values for the costing step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionOverrides {
    pub area_ha: Option<f64>,
    pub yield_kg_per_ha: Option<f64>,
    pub field_loss_pct: Option<f64>,
    pub processing_loss_pct: Option<f64>,
}

/// Explicit values for the simulation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOverrides {
    pub samples: Option<u32>,
    pub area_ha: Option<f64>,
    pub yield_spec: Option<TriangularSpec>,
    pub price_spec: Option<TriangularSpec>,
    pub cost_spec: Option<TriangularSpec>,
}

/// Explicit values for the pricing step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingOverrides {
    /// Take the unit cost from the carried costing when one exists.
    pub use_carried_unit_cost: bool,
    pub unit_variable_cost: Option<f64>,
    pub fixed_costs_total: Option<f64>,
    pub desired_profit_total: Option<f64>,
    pub forecast_volume_kg: Option<f64>,
    pub tax_pct: Option<f64>,
    pub variable_expense_pct: Option<f64>,
}

impl Default for PricingOverrides {
    fn default() -> Self {
        Self {
            use_carried_unit_cost: true,
            unit_variable_cost: None,
            fixed_costs_total: None,
            desired_profit_total: None,
            forecast_volume_kg: None,
            tax_pct: None,
            variable_expense_pct: None,
        }
    }
}
