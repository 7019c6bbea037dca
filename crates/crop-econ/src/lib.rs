#![deny(warnings)]

//! Economic models for a single crop cycle.
//!
//! This crate provides validated calculations for:
//! - Stage cost aggregation and the unit variable cost of sellable output
//! - Monte Carlo scenarios over triangular yield, price and unit cost
//! - Markup pricing net of taxes and variable selling expenses

pub mod costing;
pub mod monte_carlo;
pub mod pricing;
pub mod stats;

pub use costing::{
    aggregate_stage, compute_costing, total_variable_cost, CostingError, CostingResult,
    StageCostResult,
};
pub use monte_carlo::{
    simulate, simulate_seeded, simulate_unseeded, SampledVariable, ScenarioSample,
    ScenarioSummary, SimulationError, Triangular,
};
pub use pricing::{solve, PricingError, PricingResult, GOAL_TOLERANCE};
pub use stats::{Describe, Histogram};
