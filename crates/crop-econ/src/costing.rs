//! Stage cost aggregation and the variable costing model.

use crop_core::{
    ensure_non_negative, validate_production, CostLineItem, ProductionOutput,
    ProductionParameters, StageId, ValidationError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors produced by the costing model.
#[derive(Debug, Error, PartialEq)]
pub enum CostingError {
    /// Losses or inputs leave nothing to sell; no unit cost can be derived.
    #[error("final sellable output is {} kg; adjust production or loss inputs", .output.final_sellable_kg)]
    ZeroOutput {
        total_variable_cost: f64,
        output: ProductionOutput,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Line items and total of one production stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageCostResult {
    pub stage_id: StageId,
    pub line_items: Vec<CostLineItem>,
    pub other_costs: f64,
    /// Sum of line item subtotals plus `other_costs`.
    pub total: f64,
}

/// Sum of `quantity * unit_cost` over the items, plus the miscellaneous
/// lump sum. Inputs are validated at the boundary, not here.
pub fn aggregate_stage(
    stage_id: StageId,
    line_items: Vec<CostLineItem>,
    other_costs: f64,
) -> StageCostResult {
    let total = line_items.iter().map(CostLineItem::subtotal).sum::<f64>() + other_costs;
    debug!(?stage_id, items = line_items.len(), total, "stage aggregated");
    StageCostResult {
        stage_id,
        line_items,
        other_costs,
        total,
    }
}

/// Plain sum of the stage totals.
pub fn total_variable_cost(stages: &[StageCostResult]) -> f64 {
    stages.iter().map(|s| s.total).sum()
}

/// Outcome of a successful costing run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostingResult {
    /// Totals of the establishment, maintenance and harvest stages.
    pub stage_totals: [f64; 3],
    pub total_variable_cost: f64,
    pub output: ProductionOutput,
    pub final_sellable_kg: f64,
    /// `total_variable_cost / final_sellable_kg`.
    pub unit_variable_cost: f64,
}

/// Derive the unit variable cost of a cycle.
///
/// Deterministic: identical inputs give identical results. Returns
/// [`CostingError::ZeroOutput`] instead of dividing when nothing is left to
/// sell.
pub fn compute_costing(
    stage_totals: [f64; 3],
    params: &ProductionParameters,
) -> Result<CostingResult, CostingError> {
    validate_production(params)?;
    for total in stage_totals {
        ensure_non_negative("stage_total", total)?;
    }
    let total_variable_cost: f64 = stage_totals.iter().sum();
    let output = params.output();
    debug!(
        total_variable_cost,
        harvested_kg = output.harvested_kg,
        post_field_kg = output.post_field_kg,
        final_sellable_kg = output.final_sellable_kg,
        "costing inputs resolved"
    );
    if output.final_sellable_kg <= 0.0 {
        warn!(total_variable_cost, "zero sellable output, no unit cost derived");
        return Err(CostingError::ZeroOutput {
            total_variable_cost,
            output,
        });
    }
    Ok(CostingResult {
        stage_totals,
        total_variable_cost,
        output,
        final_sellable_kg: output.final_sellable_kg,
        unit_variable_cost: total_variable_cost / output.final_sellable_kg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(quantity: f64, unit_cost: f64) -> CostLineItem {
        CostLineItem {
            name: "item".to_string(),
            sample_unit: "unit".to_string(),
            quantity,
            unit_cost,
        }
    }

    fn params(area: f64, yield_kg: f64, field: f64, processing: f64) -> ProductionParameters {
        ProductionParameters {
            area_ha: area,
            yield_kg_per_ha: yield_kg,
            field_loss_pct: field,
            processing_loss_pct: processing,
        }
    }

    #[test]
    fn stage_total_includes_other_costs() {
        let stage = aggregate_stage(
            StageId::Establishment,
            vec![item(2.0, 150.0), item(10.0, 8.5)],
            40.0,
        );
        assert_eq!(stage.total, 425.0);
        assert_eq!(stage.line_items.len(), 2);
    }

    #[test]
    fn empty_stage_is_other_costs_only() {
        let stage = aggregate_stage(StageId::Harvest, vec![], 12.5);
        assert_eq!(stage.total, 12.5);
    }

    #[test]
    fn stages_sum_to_total_variable_cost() {
        let stages = vec![
            aggregate_stage(StageId::Establishment, vec![item(1.0, 1000.0)], 0.0),
            aggregate_stage(StageId::Maintenance, vec![item(4.0, 200.0)], 0.0),
            aggregate_stage(StageId::Harvest, vec![], 1200.0),
        ];
        assert_eq!(total_variable_cost(&stages), 3000.0);
    }

    #[test]
    fn cassava_reference_cycle() {
        let r = compute_costing([1000.0, 800.0, 1200.0], &params(2.0, 20_000.0, 5.0, 20.0)).unwrap();
        assert_eq!(r.total_variable_cost, 3000.0);
        assert_eq!(r.output.harvested_kg, 40_000.0);
        assert!((r.output.post_field_kg - 38_000.0).abs() < 1e-9);
        assert!((r.final_sellable_kg - 30_400.0).abs() < 1e-9);
        assert!((r.unit_variable_cost - 0.098_684).abs() < 1e-6);
    }

    #[test]
    fn zero_output_is_reported_not_divided() {
        let err = compute_costing([1000.0, 800.0, 1200.0], &params(2.0, 20_000.0, 100.0, 20.0))
            .unwrap_err();
        match err {
            CostingError::ZeroOutput {
                total_variable_cost,
                output,
            } => {
                assert_eq!(total_variable_cost, 3000.0);
                assert_eq!(output.harvested_kg, 40_000.0);
                assert_eq!(output.final_sellable_kg, 0.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            compute_costing([0.0; 3], &params(1.0, 0.0, 0.0, 0.0)),
            Err(CostingError::ZeroOutput { .. })
        ));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            compute_costing([1.0; 3], &params(0.0, 1.0, 0.0, 0.0)),
            Err(CostingError::Invalid(ValidationError::NonPositive { .. }))
        ));
        assert!(matches!(
            compute_costing([1.0, -1.0, 1.0], &params(1.0, 1.0, 0.0, 0.0)),
            Err(CostingError::Invalid(ValidationError::Negative { .. }))
        ));
    }

    proptest! {
        #[test]
        fn costing_is_deterministic(a in 0.0f64..1e6, b in 0.0f64..1e6, c in 0.0f64..1e6,
                                    area in 0.1f64..100.0, yield_kg in 1.0f64..50_000.0,
                                    field in 0.0f64..99.0, processing in 0.0f64..99.0) {
            let p = params(area, yield_kg, field, processing);
            let r1 = compute_costing([a, b, c], &p).unwrap();
            let r2 = compute_costing([a, b, c], &p).unwrap();
            prop_assert_eq!(r1.unit_variable_cost.to_bits(), r2.unit_variable_cost.to_bits());
            prop_assert_eq!(r1, r2);
            prop_assert!(r1.unit_variable_cost >= 0.0);
        }
    }
}
