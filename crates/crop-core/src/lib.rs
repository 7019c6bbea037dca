#![deny(warnings)]

//! Core domain models and invariants for crop variable costing.
//!
//! This crate defines the serializable inputs shared by the costing,
//! simulation and pricing models, together with boundary validation helpers
//! that reject negative, non-finite or out-of-range values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod stages;

pub use stages::{default_catalogue, ItemTemplate, StageDescriptor, StageId};

/// A single quantity × unit cost entry within a production stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    /// Display name, e.g. "Planting cuttings".
    pub name: String,
    /// Example unit shown next to the quantity (display hint only).
    pub sample_unit: String,
    /// Quantity consumed in the cycle (>= 0).
    pub quantity: f64,
    /// Cost per unit of quantity (>= 0).
    pub unit_cost: f64,
}

impl CostLineItem {
    /// Build a line item from a catalogue template.
    pub fn from_template(template: &ItemTemplate, quantity: f64, unit_cost: f64) -> Self {
        Self {
            name: template.name.clone(),
            sample_unit: template.sample_unit.clone(),
            quantity,
            unit_cost,
        }
    }

    /// `quantity * unit_cost`.
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}

/// Area, yield and the two sequential loss percentages of a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionParameters {
    /// Planted area in hectares (> 0).
    pub area_ha: f64,
    /// Expected harvested yield in kg per hectare (>= 0).
    pub yield_kg_per_ha: f64,
    /// Losses in the field and at harvest, in percent of the harvested mass.
    pub field_loss_pct: f64,
    /// Losses in processing and post-harvest, in percent of what leaves the field.
    pub processing_loss_pct: f64,
}

/// Output quantities after each loss step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionOutput {
    pub harvested_kg: f64,
    pub post_field_kg: f64,
    pub final_sellable_kg: f64,
}

impl ProductionParameters {
    /// Apply the field loss, then the processing loss on what remains.
    ///
    /// Losses compound; they are never added together.
    pub fn output(&self) -> ProductionOutput {
        let harvested_kg = self.area_ha * self.yield_kg_per_ha;
        let post_field_kg = harvested_kg * (1.0 - self.field_loss_pct / 100.0);
        let final_sellable_kg = post_field_kg * (1.0 - self.processing_loss_pct / 100.0);
        ProductionOutput {
            harvested_kg,
            post_field_kg,
            final_sellable_kg,
        }
    }
}

/// Minimum, most likely and maximum value of a triangular distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriangularSpec {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

impl TriangularSpec {
    pub fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min, mode, max }
    }

    /// True when `min <= mode <= max`. NaN bounds are never ordered.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.mode && self.mode <= self.max
    }

    /// Analytical mean `(min + mode + max) / 3`.
    pub fn mean(&self) -> f64 {
        (self.min + self.mode + self.max) / 3.0
    }
}

/// Inputs of one Monte Carlo run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Number of scenarios to draw, within [1000, 50000].
    pub samples: u32,
    /// Area the sampled yield applies to, in hectares (> 0).
    pub area_ha: f64,
    /// Yield in kg/ha.
    pub yield_spec: TriangularSpec,
    /// Sale price per kg.
    pub price_spec: TriangularSpec,
    /// Unit variable cost per kg.
    pub cost_spec: TriangularSpec,
}

/// Inputs of the markup price solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    /// Variable cost per sellable kg (> 0).
    pub unit_variable_cost: f64,
    /// Fixed costs this production should cover (>= 0).
    pub fixed_costs_total: f64,
    /// Profit targeted for this production (>= 0).
    pub desired_profit_total: f64,
    /// Expected sales volume in kg (> 0).
    pub forecast_volume_kg: f64,
    /// Taxes on revenue, percent of the sale price.
    pub tax_pct: f64,
    /// Variable selling expenses (freight, commissions), percent of the sale price.
    pub variable_expense_pct: f64,
}

/// Validation errors for boundary inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    /// Quantity or monetary value must be non-negative.
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    /// Value must be strictly positive.
    #[error("{field} must be > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    /// Percentage outside [0, 100].
    #[error("{field} must be within [0, 100], got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
}

/// Reject NaN and infinities.
pub fn ensure_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite(field))
    }
}

/// Finite and >= 0.
pub fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Finite and > 0.
pub fn ensure_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    ensure_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    Ok(())
}

/// Finite and within [0, 100].
pub fn ensure_percent(field: &'static str, value: f64) -> Result<(), ValidationError> {
    ensure_finite(field, value)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::PercentOutOfRange { field, value });
    }
    Ok(())
}

/// Validate a cost line item.
pub fn validate_line_item(item: &CostLineItem) -> Result<(), ValidationError> {
    ensure_non_negative("quantity", item.quantity)?;
    ensure_non_negative("unit_cost", item.unit_cost)?;
    Ok(())
}

/// Validate the lump sum of miscellaneous stage costs.
pub fn validate_other_costs(other_costs: f64) -> Result<(), ValidationError> {
    ensure_non_negative("other_costs", other_costs)
}

/// Validate production parameters.
pub fn validate_production(p: &ProductionParameters) -> Result<(), ValidationError> {
    ensure_positive("area_ha", p.area_ha)?;
    ensure_non_negative("yield_kg_per_ha", p.yield_kg_per_ha)?;
    ensure_percent("field_loss_pct", p.field_loss_pct)?;
    ensure_percent("processing_loss_pct", p.processing_loss_pct)?;
    Ok(())
}

/// Validate the field-level constraints of a pricing request.
///
/// Cross-field rules (positive unit cost and volume, rate sum below one)
/// are enforced by the solver itself.
pub fn validate_pricing_fields(r: &PricingRequest) -> Result<(), ValidationError> {
    ensure_finite("unit_variable_cost", r.unit_variable_cost)?;
    ensure_non_negative("fixed_costs_total", r.fixed_costs_total)?;
    ensure_non_negative("desired_profit_total", r.desired_profit_total)?;
    ensure_finite("forecast_volume_kg", r.forecast_volume_kg)?;
    ensure_percent("tax_pct", r.tax_pct)?;
    ensure_percent("variable_expense_pct", r.variable_expense_pct)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(area: f64, yield_kg: f64, field: f64, processing: f64) -> ProductionParameters {
        ProductionParameters {
            area_ha: area,
            yield_kg_per_ha: yield_kg,
            field_loss_pct: field,
            processing_loss_pct: processing,
        }
    }

    #[test]
    fn losses_compound_sequentially() {
        let out = params(2.0, 20_000.0, 5.0, 20.0).output();
        assert_eq!(out.harvested_kg, 40_000.0);
        assert!((out.post_field_kg - 38_000.0).abs() < 1e-9);
        assert!((out.final_sellable_kg - 30_400.0).abs() < 1e-9);
    }

    #[test]
    fn full_loss_yields_zero_output() {
        let out = params(1.0, 20_000.0, 100.0, 0.0).output();
        assert_eq!(out.final_sellable_kg, 0.0);
        let out = params(1.0, 20_000.0, 0.0, 100.0).output();
        assert_eq!(out.final_sellable_kg, 0.0);
    }

    #[test]
    fn subtotal_is_quantity_times_cost() {
        let item = CostLineItem {
            name: "Labour".to_string(),
            sample_unit: "days".to_string(),
            quantity: 12.0,
            unit_cost: 80.0,
        };
        assert_eq!(item.subtotal(), 960.0);
        assert!(validate_line_item(&item).is_ok());
    }

    #[test]
    fn rejects_negative_line_item() {
        let item = CostLineItem {
            name: "Fuel".to_string(),
            sample_unit: "l".to_string(),
            quantity: -1.0,
            unit_cost: 5.0,
        };
        assert_eq!(
            validate_line_item(&item),
            Err(ValidationError::Negative {
                field: "quantity",
                value: -1.0
            })
        );
    }

    #[test]
    fn production_validation() {
        assert!(validate_production(&params(1.0, 0.0, 0.0, 100.0)).is_ok());
        assert!(matches!(
            validate_production(&params(0.0, 1.0, 0.0, 0.0)),
            Err(ValidationError::NonPositive { field: "area_ha", .. })
        ));
        assert!(matches!(
            validate_production(&params(1.0, 1.0, 101.0, 0.0)),
            Err(ValidationError::PercentOutOfRange { field: "field_loss_pct", .. })
        ));
        assert_eq!(
            validate_production(&params(1.0, f64::NAN, 0.0, 0.0)),
            Err(ValidationError::NonFinite("yield_kg_per_ha"))
        );
    }

    #[test]
    fn triangular_ordering() {
        assert!(TriangularSpec::new(1.0, 2.0, 3.0).is_ordered());
        assert!(TriangularSpec::new(2.0, 2.0, 2.0).is_ordered());
        assert!(!TriangularSpec::new(25_000.0, 20_000.0, 30_000.0).is_ordered());
        assert!(!TriangularSpec::new(1.0, 4.0, 3.0).is_ordered());
        assert!(!TriangularSpec::new(f64::NAN, 1.0, 2.0).is_ordered());
        assert_eq!(TriangularSpec::new(1.0, 2.0, 6.0).mean(), 3.0);
    }

    #[test]
    fn serde_roundtrip_pricing_request() {
        let r = PricingRequest {
            unit_variable_cost: 1.5,
            fixed_costs_total: 500.0,
            desired_profit_total: 200.0,
            forecast_volume_kg: 1000.0,
            tax_pct: 5.0,
            variable_expense_pct: 3.0,
        };
        let s = serde_json::to_string(&r).unwrap();
        let back: PricingRequest = serde_json::from_str(&s).unwrap();
        assert_eq!(back, r);
        assert!(validate_pricing_fields(&r).is_ok());
    }

    proptest! {
        #[test]
        fn sellable_output_is_bounded(area in 0.01f64..1_000.0,
                                      yield_kg in 0.0f64..100_000.0,
                                      field in 0.0f64..100.0,
                                      processing in 0.0f64..100.0) {
            let out = params(area, yield_kg, field, processing).output();
            prop_assert!(out.final_sellable_kg >= 0.0);
            prop_assert!(out.final_sellable_kg <= out.post_field_kg);
            prop_assert!(out.post_field_kg <= out.harvested_kg);
            if out.harvested_kg > 0.0 && (field >= 0.01 || processing >= 0.01) {
                prop_assert!(out.final_sellable_kg < out.harvested_kg);
            }
        }

        #[test]
        fn lossless_output_equals_harvest(area in 0.01f64..1_000.0, yield_kg in 0.0f64..100_000.0) {
            let out = params(area, yield_kg, 0.0, 0.0).output();
            prop_assert_eq!(out.final_sellable_kg, out.harvested_kg);
        }
    }
}
