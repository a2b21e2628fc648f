//! Bench simulator for VREF trim calibration.
//!
//! Runs the trim search against a simulated reference, prints the per-iteration
//! CSV to stdout and the final report after it. Logs go to stderr.
//!
//! ```bash
//! vref-trim-sim --config bench.hjson --noise-mv 1.5 --runs 5
//! ```

mod config;
mod sim;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use vref_trim::diag::DiagnosticSink;
use vref_trim::search;
use vref_trim::NoopSink;

use crate::config::SimConfig;
use crate::sim::{CsvSink, SimulatedVref, StdDelay};

/// Calibrate a simulated voltage reference trim
#[derive(Parser, Debug)]
#[command(name = "vref-trim-sim", version)]
struct Args {
    /// HJSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Target voltage (V)
    #[arg(long)]
    target: Option<f32>,

    /// Convergence tolerance (mV)
    #[arg(long)]
    tolerance_mv: Option<f32>,

    /// Iteration budget
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Peak simulated noise (mV)
    #[arg(long)]
    noise_mv: Option<f32>,

    /// RNG seed for the first run; later runs use seed + run index
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent calibrations
    #[arg(long)]
    runs: Option<u32>,

    /// Skip the per-iteration CSV
    #[arg(long)]
    quiet: bool,
}

impl Args {
    fn apply(&self, cfg: &mut SimConfig) {
        if let Some(v) = self.target {
            cfg.target_v = v;
        }
        if let Some(v) = self.tolerance_mv {
            cfg.tolerance_mv = v;
        }
        if let Some(v) = self.max_iterations {
            cfg.max_iterations = v;
        }
        if let Some(v) = self.noise_mv {
            cfg.model.noise_mv = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.runs {
            cfg.runs = v;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    args.apply(&mut cfg);
    let calibration = cfg.calibration()?;

    info!(
        "target {}V, tolerance {}mV, {} iterations max, noise {}mV",
        cfg.target_v, cfg.tolerance_mv, cfg.max_iterations, cfg.model.noise_mv
    );

    let mut failures = 0u32;
    for run in 0..cfg.runs {
        let hw = SimulatedVref::new(
            cfg.model,
            calibration.measure.reference_v,
            cfg.seed.wrapping_add(run as u64),
        );

        let (outcome, hw) = if args.quiet {
            run_once(hw, calibration, &mut NoopSink)
        } else {
            let mut sink = CsvSink::new(io::stdout().lock());
            let result = run_once(hw, calibration, &mut sink);
            sink.finish().context("writing diagnostics")?;
            result
        };

        match outcome {
            Ok(r) => println!(
                "run {}: trim={} vref={:.4}V bandgap={:.4}V ({}) trim_writes={}",
                run,
                r.trim,
                r.voltage_v,
                r.bandgap_v,
                if r.bandgap_ok { "ok" } else { "OUT OF RANGE" },
                hw.trim_writes()
            ),
            Err(e) => {
                println!("run {}: trim={} ({})", run, e.sentinel(), e);
                error!("run {} failed, reference left at trim {}", run, hw.trim());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} runs did not converge", failures, cfg.runs);
    }
    Ok(())
}

fn run_once<S: DiagnosticSink>(
    hw: SimulatedVref,
    config: vref_trim::Config,
    sink: &mut S,
) -> (Result<vref_trim::report::CalibrationReport, search::Error>, SimulatedVref) {
    let (outcome, hw, _) = vref_trim::calibrate(hw, StdDelay, config, sink);
    (outcome, hw)
}
