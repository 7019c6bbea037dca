//! Monte Carlo scenario engine over triangular yield, price and unit cost.
//!
//! Each scenario draws the three quantities independently; no correlation
//! between yield, price and cost is induced. The random source is injected
//! so runs can be reproduced from a seed.

use crate::stats::{self, Describe, Histogram};
use crop_core::{SimulationRequest, TriangularSpec};
use rand::distributions::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Smallest accepted number of scenarios.
pub const MIN_SAMPLES: u32 = 1_000;
/// Largest accepted number of scenarios; caps the cost of a run.
pub const MAX_SAMPLES: u32 = 50_000;
/// Number of total-margin histogram buckets in a summary.
pub const HISTOGRAM_BINS: usize = 30;

/// The three independently sampled quantities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampledVariable {
    Yield,
    Price,
    UnitCost,
}

impl fmt::Display for SampledVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampledVariable::Yield => "yield (kg/ha)",
            SampledVariable::Price => "price (per kg)",
            SampledVariable::UnitCost => "unit variable cost (per kg)",
        };
        f.write_str(name)
    }
}

/// Reasons a simulation is rejected before any sampling.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("sample count {0} outside [{min}, {max}]", min = MIN_SAMPLES, max = MAX_SAMPLES)]
    SampleCount(u32),
    #[error("simulation area must be > 0, got {0}")]
    NonPositiveArea(f64),
    #[error("{0}: bounds must be finite")]
    NonFinite(SampledVariable),
    /// `min <= mode <= max` does not hold.
    #[error("{variable}: expected min <= most likely <= max, got {min} / {mode} / {max}")]
    Ordering {
        variable: SampledVariable,
        min: f64,
        mode: f64,
        max: f64,
    },
}

/// Continuous triangular distribution sampled by inverse CDF.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangular {
    min: f64,
    mode: f64,
    max: f64,
    /// CDF value at the mode.
    split: f64,
}

impl Triangular {
    /// Returns None unless the bounds are finite and ordered.
    pub fn new(spec: TriangularSpec) -> Option<Self> {
        let finite = spec.min.is_finite() && spec.mode.is_finite() && spec.max.is_finite();
        if !finite || !spec.is_ordered() {
            return None;
        }
        let range = spec.max - spec.min;
        let split = if range > 0.0 {
            (spec.mode - spec.min) / range
        } else {
            0.0
        };
        Some(Self {
            min: spec.min,
            mode: spec.mode,
            max: spec.max,
            split,
        })
    }
}

impl Distribution<f64> for Triangular {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let range = self.max - self.min;
        if range <= 0.0 {
            return self.min;
        }
        let u: f64 = rng.gen();
        let value = if u < self.split {
            self.min + (u * range * (self.mode - self.min)).sqrt()
        } else {
            self.max - ((1.0 - u) * range * (self.max - self.mode)).sqrt()
        };
        // Keep rounding at the tails inside the support.
        value.max(self.min).min(self.max)
    }
}

/// One drawn scenario and its derived economics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSample {
    pub yield_kg_ha: f64,
    pub price_per_kg: f64,
    pub unit_var_cost: f64,
    pub total_output_kg: f64,
    pub revenue: f64,
    pub variable_cost_total: f64,
    pub total_margin: f64,
    pub unit_margin: f64,
}

impl ScenarioSample {
    pub fn new(yield_kg_ha: f64, price_per_kg: f64, unit_var_cost: f64, area_ha: f64) -> Self {
        let total_output_kg = yield_kg_ha * area_ha;
        let revenue = price_per_kg * total_output_kg;
        let variable_cost_total = unit_var_cost * total_output_kg;
        Self {
            yield_kg_ha,
            price_per_kg,
            unit_var_cost,
            total_output_kg,
            revenue,
            variable_cost_total,
            total_margin: revenue - variable_cost_total,
            unit_margin: price_per_kg - unit_var_cost,
        }
    }
}

/// Aggregate view over all scenarios of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub samples: u32,
    pub mean_total_margin: f64,
    /// Share of scenarios with a strictly negative total margin, in [0, 1].
    pub loss_probability: f64,
    pub mean_unit_margin: f64,
    pub revenue: Describe,
    pub variable_cost_total: Describe,
    pub total_margin: Describe,
    pub unit_margin: Describe,
    /// Per-scenario total margin, in draw order.
    pub total_margin_series: Vec<f64>,
    pub total_margin_histogram: Histogram,
}

struct Distributions {
    yield_kg_ha: Triangular,
    price: Triangular,
    unit_cost: Triangular,
}

fn distribution(variable: SampledVariable, spec: TriangularSpec) -> Result<Triangular, SimulationError> {
    if !(spec.min.is_finite() && spec.mode.is_finite() && spec.max.is_finite()) {
        return Err(SimulationError::NonFinite(variable));
    }
    Triangular::new(spec).ok_or(SimulationError::Ordering {
        variable,
        min: spec.min,
        mode: spec.mode,
        max: spec.max,
    })
}

fn prepare(request: &SimulationRequest) -> Result<Distributions, SimulationError> {
    if !(MIN_SAMPLES..=MAX_SAMPLES).contains(&request.samples) {
        return Err(SimulationError::SampleCount(request.samples));
    }
    if !(request.area_ha.is_finite() && request.area_ha > 0.0) {
        return Err(SimulationError::NonPositiveArea(request.area_ha));
    }
    Ok(Distributions {
        yield_kg_ha: distribution(SampledVariable::Yield, request.yield_spec)?,
        price: distribution(SampledVariable::Price, request.price_spec)?,
        unit_cost: distribution(SampledVariable::UnitCost, request.cost_spec)?,
    })
}

/// Check every precondition of a run without drawing anything.
pub fn validate_request(request: &SimulationRequest) -> Result<(), SimulationError> {
    prepare(request).map(|_| ())
}

/// Draw `request.samples` scenarios.
pub fn draw_scenarios<R: Rng + ?Sized>(
    rng: &mut R,
    request: &SimulationRequest,
) -> Result<Vec<ScenarioSample>, SimulationError> {
    let dists = prepare(request)?;
    Ok(draw_from(&dists, rng, request))
}

fn draw_from<R: Rng + ?Sized>(
    dists: &Distributions,
    rng: &mut R,
    request: &SimulationRequest,
) -> Vec<ScenarioSample> {
    let n = request.samples as usize;
    let mut scenarios = Vec::with_capacity(n);
    for _ in 0..n {
        let y = dists.yield_kg_ha.sample(rng);
        let p = dists.price.sample(rng);
        let c = dists.unit_cost.sample(rng);
        scenarios.push(ScenarioSample::new(y, p, c, request.area_ha));
    }
    scenarios
}

fn column(scenarios: &[ScenarioSample], f: impl Fn(&ScenarioSample) -> f64) -> Vec<f64> {
    scenarios.iter().map(f).collect()
}

fn summarize(samples: u32, scenarios: &[ScenarioSample]) -> Option<ScenarioSummary> {
    let revenue = column(scenarios, |s| s.revenue);
    let variable_cost_total = column(scenarios, |s| s.variable_cost_total);
    let total_margin = column(scenarios, |s| s.total_margin);
    let unit_margin = column(scenarios, |s| s.unit_margin);
    Some(ScenarioSummary {
        samples,
        mean_total_margin: stats::mean(&total_margin)?,
        loss_probability: stats::negative_share(&total_margin)?,
        mean_unit_margin: stats::mean(&unit_margin)?,
        revenue: stats::describe(&revenue)?,
        variable_cost_total: stats::describe(&variable_cost_total)?,
        total_margin: stats::describe(&total_margin)?,
        unit_margin: stats::describe(&unit_margin)?,
        total_margin_histogram: stats::histogram(&total_margin, HISTOGRAM_BINS)?,
        total_margin_series: total_margin,
    })
}

/// Run a full simulation with the given random source.
///
/// Every precondition is checked before anything is allocated or drawn;
/// a rejected request produces no partial result.
pub fn simulate<R: Rng + ?Sized>(
    rng: &mut R,
    request: &SimulationRequest,
) -> Result<ScenarioSummary, SimulationError> {
    let dists = match prepare(request) {
        Ok(dists) => dists,
        Err(e) => {
            warn!(error = %e, "simulation rejected");
            return Err(e);
        }
    };
    let scenarios = draw_from(&dists, rng, request);
    debug!(drawn = scenarios.len(), "scenarios drawn");
    // The sample count is validated to be at least MIN_SAMPLES, so every
    // statistic is defined.
    let summary = summarize(request.samples, &scenarios)
        .ok_or(SimulationError::SampleCount(request.samples))?;
    info!(
        samples = summary.samples,
        mean_total_margin = summary.mean_total_margin,
        loss_probability = summary.loss_probability,
        mean_unit_margin = summary.mean_unit_margin,
        "simulation complete"
    );
    Ok(summary)
}

/// Reproducible run driven by a ChaCha8 stream seeded from `seed`.
pub fn simulate_seeded(
    seed: u64,
    request: &SimulationRequest,
) -> Result<ScenarioSummary, SimulationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    simulate(&mut rng, request)
}

/// Run seeded from OS entropy; results vary between runs.
pub fn simulate_unseeded(request: &SimulationRequest) -> Result<ScenarioSummary, SimulationError> {
    let mut rng = ChaCha8Rng::from_entropy();
    simulate(&mut rng, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::Rng;

    fn request(samples: u32) -> SimulationRequest {
        SimulationRequest {
            samples,
            area_ha: 1.0,
            yield_spec: TriangularSpec::new(15_000.0, 20_000.0, 25_000.0),
            price_spec: TriangularSpec::new(2.0, 2.5, 3.0),
            cost_spec: TriangularSpec::new(1.2, 1.5, 1.8),
        }
    }

    #[test]
    fn rejects_yield_with_mode_below_min() {
        let mut r = request(10_000);
        r.yield_spec = TriangularSpec::new(25_000.0, 20_000.0, 30_000.0);
        let err = simulate_seeded(1, &r).unwrap_err();
        assert_eq!(
            err,
            SimulationError::Ordering {
                variable: SampledVariable::Yield,
                min: 25_000.0,
                mode: 20_000.0,
                max: 30_000.0,
            }
        );
    }

    #[test]
    fn rejects_each_spec_independently() {
        let mut r = request(10_000);
        r.price_spec = TriangularSpec::new(2.0, 3.5, 3.0);
        assert!(matches!(
            validate_request(&r),
            Err(SimulationError::Ordering { variable: SampledVariable::Price, .. })
        ));

        let mut r = request(10_000);
        r.cost_spec = TriangularSpec::new(1.6, 1.5, 1.8);
        assert!(matches!(
            validate_request(&r),
            Err(SimulationError::Ordering { variable: SampledVariable::UnitCost, .. })
        ));

        let mut r = request(10_000);
        r.price_spec = TriangularSpec::new(f64::NEG_INFINITY, 2.5, 3.0);
        assert_eq!(
            validate_request(&r),
            Err(SimulationError::NonFinite(SampledVariable::Price))
        );
    }

    #[test]
    fn rejected_request_draws_nothing() {
        let mut r = request(10_000);
        r.cost_spec = TriangularSpec::new(1.6, 1.5, 1.8);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut untouched = rng.clone();
        assert!(simulate(&mut rng, &r).is_err());
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn rejects_out_of_range_sample_count_and_area() {
        assert_eq!(
            validate_request(&request(999)),
            Err(SimulationError::SampleCount(999))
        );
        assert_eq!(
            validate_request(&request(50_001)),
            Err(SimulationError::SampleCount(50_001))
        );
        assert!(validate_request(&request(MIN_SAMPLES)).is_ok());
        assert!(validate_request(&request(MAX_SAMPLES)).is_ok());
        let mut r = request(1_000);
        r.area_ha = 0.0;
        assert_eq!(validate_request(&r), Err(SimulationError::NonPositiveArea(0.0)));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let a = simulate_seeded(42, &request(2_000)).unwrap();
        let b = simulate_seeded(42, &request(2_000)).unwrap();
        assert_eq!(a, b);
        let c = simulate_seeded(43, &request(2_000)).unwrap();
        assert_ne!(a.total_margin_series, c.total_margin_series);
    }

    #[test]
    fn summary_shapes_match_sample_count() {
        let s = simulate_seeded(7, &request(5_000)).unwrap();
        assert_eq!(s.samples, 5_000);
        assert_eq!(s.total_margin_series.len(), 5_000);
        assert_eq!(s.revenue.count, 5_000);
        assert_eq!(s.total_margin_histogram.counts.len(), HISTOGRAM_BINS);
        assert_eq!(s.total_margin_histogram.counts.iter().sum::<u64>(), 5_000);
        assert!((s.total_margin.mean - s.mean_total_margin).abs() < 1e-6);
    }

    #[test]
    fn derived_fields_follow_definitions() {
        let s = ScenarioSample::new(20_000.0, 2.5, 1.5, 2.0);
        assert_eq!(s.total_output_kg, 40_000.0);
        assert_eq!(s.revenue, 100_000.0);
        assert_eq!(s.variable_cost_total, 60_000.0);
        assert_eq!(s.total_margin, 40_000.0);
        assert_eq!(s.unit_margin, 1.0);
    }

    #[test]
    fn loss_probability_extremes() {
        let profitable = simulate_seeded(3, &request(1_000)).unwrap();
        assert_eq!(profitable.loss_probability, 0.0);

        let mut r = request(1_000);
        r.cost_spec = TriangularSpec::new(3.5, 4.0, 4.5);
        let losing = simulate_seeded(3, &r).unwrap();
        assert_eq!(losing.loss_probability, 1.0);
        assert!(losing.mean_unit_margin < 0.0);
    }

    #[test]
    fn sample_means_converge_to_triangular_mean() {
        let r = SimulationRequest {
            samples: MAX_SAMPLES,
            area_ha: 1.0,
            yield_spec: TriangularSpec::new(15_000.0, 17_000.0, 25_000.0),
            price_spec: TriangularSpec::new(2.0, 2.9, 3.0),
            cost_spec: TriangularSpec::new(1.0, 1.0, 2.0),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let scenarios = draw_scenarios(&mut rng, &r).unwrap();
        let n = scenarios.len() as f64;
        let mean_yield = scenarios.iter().map(|s| s.yield_kg_ha).sum::<f64>() / n;
        let mean_price = scenarios.iter().map(|s| s.price_per_kg).sum::<f64>() / n;
        let mean_cost = scenarios.iter().map(|s| s.unit_var_cost).sum::<f64>() / n;
        assert!((mean_yield - r.yield_spec.mean()).abs() < 100.0);
        assert!((mean_price - r.price_spec.mean()).abs() < 0.01);
        assert!((mean_cost - r.cost_spec.mean()).abs() < 0.01);
    }

    #[test]
    fn degenerate_spec_is_constant() {
        let d = Triangular::new(TriangularSpec::new(2.0, 2.0, 2.0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            assert_eq!(d.sample(&mut rng), 2.0);
        }
    }

    proptest! {
        #[test]
        fn draws_stay_within_support(min in -1e4f64..1e4, a in 0.0f64..1e4, b in 0.0f64..1e4, seed in any::<u64>()) {
            let spec = TriangularSpec::new(min, min + a, min + a + b);
            let d = Triangular::new(spec).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..200 {
                let v = d.sample(&mut rng);
                prop_assert!(v >= spec.min && v <= spec.max);
            }
        }

        #[test]
        fn unordered_specs_never_build(min in 0.0f64..100.0, gap in 0.001f64..100.0) {
            prop_assert!(Triangular::new(TriangularSpec::new(min + gap, min, min + 2.0 * gap)).is_none());
            prop_assert!(Triangular::new(TriangularSpec::new(min, min + 2.0 * gap, min + gap)).is_none());
        }
    }
}
