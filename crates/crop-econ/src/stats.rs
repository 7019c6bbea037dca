//! Descriptive statistics and histograms over simulated series.

use serde::{Deserialize, Serialize};

/// Count, mean, spread and order statistics of a series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Equal-width histogram. `edges` has `counts.len() + 1` entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

/// Arithmetic mean. Returns None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Share of values strictly below zero. Returns None for an empty slice.
pub fn negative_share(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let negatives = values.iter().filter(|v| **v < 0.0).count();
    Some(negatives as f64 / values.len() as f64)
}

/// Quantile of an ascending slice by linear interpolation between the two
/// nearest order statistics.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    let value = sorted[lo] + (sorted[hi] - sorted[lo]) * frac;
    // Rounding must not push the result past the bracketing order statistics.
    value.max(sorted[lo]).min(sorted[hi])
}

/// Summarize a series. Returns None for an empty slice.
pub fn describe(values: &[f64]) -> Option<Describe> {
    let mean = mean(values)?;
    let count = values.len();
    let std = if count > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    } else {
        0.0
    };
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(Describe {
        count,
        mean,
        std,
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

/// Bin values into `bins` equal-width buckets spanning [min, max]; the last
/// bucket is closed on the right. A constant series is centred in a
/// unit-wide range. Returns None for an empty slice or zero bins.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    if values.is_empty() || bins == 0 {
        return None;
    }
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0u64; bins];
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram { edges, counts })
}
