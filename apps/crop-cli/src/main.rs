#![deny(warnings)]

//! Headless CLI for variable costing, scenario simulation and markup pricing.

mod report;
mod scenario;

use anyhow::{bail, Context, Result};
use crop_core::default_catalogue;
use crop_runtime::{Session, SessionError};
use report::Report;
use scenario::Scenario;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Costing,
    Simulate,
    Price,
    All,
}

#[derive(Debug)]
struct Args {
    command: Command,
    scenario: Option<PathBuf>,
    seed: Option<u64>,
    samples: Option<u32>,
    json: bool,
}

const USAGE: &str = "usage: crop-cli [costing|simulate|price|all] [--scenario FILE] [--seed N] [--samples N] [--json]";

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut parsed = Args {
        command: Command::All,
        scenario: None,
        seed: None,
        samples: None,
        json: false,
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "costing" => parsed.command = Command::Costing,
            "simulate" => parsed.command = Command::Simulate,
            "price" => parsed.command = Command::Price,
            "all" => parsed.command = Command::All,
            "--scenario" => {
                parsed.scenario = Some(it.next().context("--scenario needs a path")?.into())
            }
            "--seed" => {
                let v = it.next().context("--seed needs a value")?;
                parsed.seed = Some(v.parse().with_context(|| format!("bad --seed {v}"))?);
            }
            "--samples" => {
                let v = it.next().context("--samples needs a value")?;
                parsed.samples = Some(v.parse().with_context(|| format!("bad --samples {v}"))?);
            }
            "--json" => parsed.json = true,
            other => bail!("unknown argument {other}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn reject(report: &mut Report, step: &str, err: SessionError) {
    warn!(step, error = %err, "step rejected");
    report.errors.push((step.to_string(), err.to_string()));
}

/// Run the requested steps through one session so later steps pick up the
/// costing result.
fn run(args: &Args, mut scenario: Scenario) -> Report {
    if args.samples.is_some() {
        scenario.simulation.samples = args.samples;
    }
    let seed = args.seed.or(scenario.seed);
    let mut session = Session::new();
    let mut report = Report::default();

    if matches!(args.command, Command::Costing | Command::All) {
        let catalogue = default_catalogue();
        let params = session.production_parameters(&scenario.production);
        match session.run_costing(scenario.stage_inputs(&catalogue), params) {
            Ok(run) => report.costing = Some(run),
            Err(SessionError::Costing(e)) => {
                if !args.json {
                    print!("{}", report::render_costing_error(&e));
                }
                reject(&mut report, "costing", SessionError::Costing(e));
            }
            Err(e) => reject(&mut report, "costing", e),
        }
    }
    if matches!(args.command, Command::Simulate | Command::All) {
        match session.run_simulation_seeded(seed, &scenario.simulation) {
            Ok(summary) => report.simulation = Some(summary),
            Err(e) => reject(&mut report, "simulation", e),
        }
    }
    if matches!(args.command, Command::Price | Command::All) {
        match session.run_pricing(&scenario.pricing) {
            Ok(result) => report.pricing = Some(result),
            Err(e) => reject(&mut report, "pricing", e),
        }
    }
    report
}

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, "starting CLI");

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let report = run(&args, scenario);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(run) = &report.costing {
            print!("{}", report::render_costing(run));
        }
        if let Some(summary) = &report.simulation {
            print!("{}", report::render_simulation(summary));
        }
        if let Some(pricing) = &report.pricing {
            print!("{}", report::render_pricing(pricing));
        }
        for (step, reason) in &report.errors {
            eprintln!("{step}: {reason}");
        }
    }

    if !report.errors.is_empty() {
        bail!("{} step(s) rejected; correct the inputs and resubmit", report.errors.len());
    }
    Ok(())
}
