//! Text and JSON rendering. Values are rounded here and nowhere else.

use crop_econ::{CostingError, Describe, PricingResult, ScenarioSummary};
use crop_runtime::CostingRun;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt::Write;

/// Round to `dp` places and group thousands, e.g. `12,345.68`.
pub fn fixed(value: f64, dp: u32) -> String {
    let Some(d) = Decimal::from_f64(value) else {
        return "n/a".to_string();
    };
    let rounded = d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", dp as usize, rounded);
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn money(value: f64) -> String {
    fixed(value, 2)
}

pub fn per_kg(value: f64) -> String {
    fixed(value, 4)
}

pub fn percent(fraction: f64) -> String {
    format!("{} %", fixed(fraction * 100.0, 1))
}

/// Outcome of every step that ran, for `--json`.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub costing: Option<CostingRun>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<ScenarioSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingResult>,
    /// Rejected steps with the reason, e.g. `("pricing", "...")`.
    pub errors: Vec<(String, String)>,
}

pub fn render_costing(run: &CostingRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Variable costing");
    for stage in &run.stages {
        let _ = writeln!(out, "{:<28} {:>16}", stage.stage_id.title(), money(stage.total));
        for item in stage.line_items.iter().filter(|i| i.subtotal() != 0.0) {
            let _ = writeln!(
                out,
                "  {:<60} {:>10} x {:>10} = {:>12}",
                item.name,
                fixed(item.quantity, 2),
                money(item.unit_cost),
                money(item.subtotal())
            );
        }
        if stage.other_costs != 0.0 {
            let _ = writeln!(out, "  {:<60} {:>38}", "Other variable costs", money(stage.other_costs));
        }
    }
    let r = &run.result;
    let _ = writeln!(out, "Harvested (kg)              {:>16}", fixed(r.output.harvested_kg, 2));
    let _ = writeln!(out, "After field losses (kg)     {:>16}", fixed(r.output.post_field_kg, 2));
    let _ = writeln!(out, "Final sellable (kg)         {:>16}", fixed(r.final_sellable_kg, 2));
    let _ = writeln!(out, "Total variable cost         {:>16}", money(r.total_variable_cost));
    let _ = writeln!(out, "Unit variable cost (per kg) {:>16}", per_kg(r.unit_variable_cost));
    out
}

pub fn render_costing_error(err: &CostingError) -> String {
    match err {
        CostingError::ZeroOutput {
            total_variable_cost,
            output,
        } => format!(
            "== Variable costing\nHarvested (kg) {} | after field losses {} | final sellable {}\n\
             Total variable cost {}\nFinal sellable output is zero. Adjust the production and loss inputs.\n",
            fixed(output.harvested_kg, 2),
            fixed(output.post_field_kg, 2),
            fixed(output.final_sellable_kg, 2),
            money(*total_variable_cost)
        ),
        other => format!("== Variable costing\n{other}\n"),
    }
}

fn describe_row(out: &mut String, label: &str, d: &Describe) {
    let _ = writeln!(
        out,
        "{:<22} {:>7} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
        label,
        d.count,
        money(d.mean),
        money(d.std),
        money(d.min),
        money(d.q25),
        money(d.median),
        money(d.q75),
        money(d.max)
    );
}

pub fn render_simulation(s: &ScenarioSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Monte Carlo ({} scenarios)", s.samples);
    let _ = writeln!(out, "Mean total margin           {:>16}", money(s.mean_total_margin));
    let _ = writeln!(out, "P(total margin < 0)         {:>16}", percent(s.loss_probability));
    let _ = writeln!(out, "Mean unit margin (per kg)   {:>16}", per_kg(s.mean_unit_margin));
    let _ = writeln!(
        out,
        "{:<22} {:>7} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
        "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    describe_row(&mut out, "Revenue", &s.revenue);
    describe_row(&mut out, "Variable cost", &s.variable_cost_total);
    describe_row(&mut out, "Total margin", &s.total_margin);
    describe_row(&mut out, "Unit margin", &s.unit_margin);

    let _ = writeln!(out, "Total margin distribution");
    let peak = s.total_margin_histogram.counts.iter().copied().max().unwrap_or(0).max(1);
    for (i, count) in s.total_margin_histogram.counts.iter().enumerate() {
        let lo = s.total_margin_histogram.edges[i];
        let bar = "#".repeat(((*count * 40) / peak) as usize);
        let _ = writeln!(out, "{:>16} | {:<40} {}", money(lo), bar, count);
    }
    out
}

pub fn render_pricing(p: &PricingResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Markup pricing");
    let _ = writeln!(out, "Suggested price (per kg)    {:>16}", per_kg(p.suggested_price));
    let _ = writeln!(out, "Effective markup            {:>14} x", fixed(p.effective_markup, 2));
    let _ = writeln!(out, "Unit contribution margin    {:>16}", per_kg(p.unit_contribution_margin));
    let _ = writeln!(out, "Per kg breakdown:");
    let _ = writeln!(out, "  taxes                     {:>16}", per_kg(p.unit_tax));
    let _ = writeln!(out, "  variable selling expenses {:>16}", per_kg(p.unit_variable_expense));
    let _ = writeln!(out, "  fixed cost target         {:>16}", per_kg(p.unit_fixed_cost_target));
    let _ = writeln!(out, "  profit target             {:>16}", per_kg(p.unit_profit_target));
    let _ = writeln!(out, "Total contribution margin   {:>16}", money(p.total_contribution_margin));
    let _ = writeln!(out, "Estimated total profit      {:>16}", money(p.total_profit_estimate));
    if p.target_met {
        let _ = writeln!(out, "Fixed costs and profit target are covered at this price.");
    } else {
        let _ = writeln!(
            out,
            "Estimated profit is below the target; revisit the target, the volume or the rates."
        );
    }
    out
}
