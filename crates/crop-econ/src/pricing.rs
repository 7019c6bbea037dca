//! Markup price solver.
//!
//! The sale price must satisfy
//! `P * (1 - tax - expense) - unit_variable_cost = target unit contribution`,
//! so it is solved in closed form rather than searched for. All intermediate
//! values are kept unrounded; rounding belongs to the renderer.

use crop_core::{validate_pricing_fields, PricingRequest, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Absolute slack (in money units) when checking that the profit target is
/// met, absorbing floating point and display rounding.
pub const GOAL_TOLERANCE: f64 = 1.0;

/// Errors produced by the price solver.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("unit variable cost must be > 0, got {0}")]
    NonPositiveUnitCost(f64),
    #[error("forecast sales volume must be > 0, got {0}")]
    NonPositiveVolume(f64),
    /// Revenue-proportional deductions would consume the whole price.
    #[error("taxes ({tax_pct}%) plus variable expenses ({variable_expense_pct}%) must stay below 100%")]
    RateSumTooHigh {
        tax_pct: f64,
        variable_expense_pct: f64,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Solved price and its per-kg and total decomposition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub suggested_price: f64,
    /// `suggested_price / unit_variable_cost`.
    pub effective_markup: f64,
    pub unit_contribution_margin: f64,
    pub unit_tax: f64,
    pub unit_variable_expense: f64,
    pub unit_fixed_cost_target: f64,
    pub unit_profit_target: f64,
    pub total_contribution_margin: f64,
    pub total_profit_estimate: f64,
    /// Contribution per kg needed to cover fixed costs and profit.
    pub mc_unit_target: f64,
    /// Tax and variable expense rates as a fraction of price.
    pub rate_sum: f64,
    /// Whether the estimated profit reaches the target within [`GOAL_TOLERANCE`].
    pub target_met: bool,
}

/// Check the solver's preconditions in order: field ranges, unit cost,
/// volume, then the combined deduction rate.
pub fn validate_request(req: &PricingRequest) -> Result<(), PricingError> {
    validate_pricing_fields(req)?;
    if req.unit_variable_cost <= 0.0 {
        return Err(PricingError::NonPositiveUnitCost(req.unit_variable_cost));
    }
    if req.forecast_volume_kg <= 0.0 {
        return Err(PricingError::NonPositiveVolume(req.forecast_volume_kg));
    }
    // Percentages summing to 100 can still give fractions that round below 1.
    if req.tax_pct + req.variable_expense_pct >= 100.0
        || req.tax_pct / 100.0 + req.variable_expense_pct / 100.0 >= 1.0
    {
        return Err(PricingError::RateSumTooHigh {
            tax_pct: req.tax_pct,
            variable_expense_pct: req.variable_expense_pct,
        });
    }
    Ok(())
}

/// Solve the sale price covering variable cost, fixed costs and profit net
/// of taxes and variable selling expenses.
///
/// ```
/// use crop_core::PricingRequest;
/// let r = crop_econ::solve(&PricingRequest { unit_variable_cost: 1.5, fixed_costs_total: 0.0,
///     desired_profit_total: 0.0, forecast_volume_kg: 1000.0, tax_pct: 0.0,
///     variable_expense_pct: 0.0 }).unwrap();
/// assert_eq!(r.suggested_price, 1.5);
/// ```
pub fn solve(req: &PricingRequest) -> Result<PricingResult, PricingError> {
    if let Err(e) = validate_request(req) {
        warn!(error = %e, "pricing request rejected");
        return Err(e);
    }
    let volume = req.forecast_volume_kg;
    let tax_rate = req.tax_pct / 100.0;
    let expense_rate = req.variable_expense_pct / 100.0;

    let mc_unit_target = (req.fixed_costs_total + req.desired_profit_total) / volume;
    let rate_sum = tax_rate + expense_rate;
    let suggested_price = (req.unit_variable_cost + mc_unit_target) / (1.0 - rate_sum);
    debug!(mc_unit_target, rate_sum, suggested_price, "price solved");

    let unit_tax = suggested_price * tax_rate;
    let unit_variable_expense = suggested_price * expense_rate;
    let unit_contribution_margin =
        suggested_price - req.unit_variable_cost - unit_tax - unit_variable_expense;
    let total_contribution_margin = unit_contribution_margin * volume;
    let total_profit_estimate = total_contribution_margin - req.fixed_costs_total;
    let target_met = total_profit_estimate >= req.desired_profit_total - GOAL_TOLERANCE;

    let result = PricingResult {
        suggested_price,
        effective_markup: suggested_price / req.unit_variable_cost,
        unit_contribution_margin,
        unit_tax,
        unit_variable_expense,
        unit_fixed_cost_target: req.fixed_costs_total / volume,
        unit_profit_target: req.desired_profit_total / volume,
        total_contribution_margin,
        total_profit_estimate,
        mc_unit_target,
        rate_sum,
        target_met,
    };
    info!(
        suggested_price,
        effective_markup = result.effective_markup,
        total_profit_estimate,
        target_met,
        "pricing complete"
    );
    Ok(result)
}
