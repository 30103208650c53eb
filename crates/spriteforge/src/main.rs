//! spriteforge: batch tool that turns source images into pixel-art sprites.
//!
//! Every input image goes through the sprite pipeline (background removal,
//! resampling, palette snapping, outline, idle animation) and is written
//! to the output directory as one PNG per frame. Sprites are processed
//! in parallel and independently: a bad input fails only itself.
//!
//! # Usage
//!
//! ```text
//! spriteforge [OPTIONS] <INPUTS>...
//! ```
//!
//! # Exit status
//!
//! - `0` every sprite was written
//! - `1` at least one sprite failed
//! - `2` the run could not start (bad flags, palette, inputs, output dir)
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=debug`) to change log verbosity.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod config;
mod sprite;
mod write;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use spriteforge_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use spriteforge_pipeline::{BatchReport, BatchRunner, Palette, PipelineConfig};

use crate::cli::Cli;
use crate::config::{ConfigError, SpriteInput};
use crate::sprite::{RunContext, SpriteRun};

/// Exit status when the run could not start.
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let Setup {
        config,
        palette,
        inputs,
    } = match setup(&cli) {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let runner = BatchRunner::new(cli.jobs);
    log::info!(
        "forging {} sprites into {} with {} jobs",
        inputs.len(),
        cli.out_dir.display(),
        runner.jobs(),
    );

    let ctx = RunContext {
        config: &config,
        palette: &palette,
        out_dir: &cli.out_dir,
        manifest: cli.manifest,
        diagnostics: cli.diagnostics,
    };
    let runs = runner.run(inputs, |input| sprite::run_sprite(&input, &ctx, &StdClock));

    if cli.diagnostics {
        print_diagnostics(&runs);
    }

    let mut report = BatchReport::default();
    for run in &runs {
        match &run.result {
            Ok(_) => report.record_success(&run.name),
            Err(e) => report.record_failure(&run.name, e),
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("error serializing report: {e}"),
        }
    } else {
        println!("{}", report.report());
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Everything a run needs before the first sprite starts.
struct Setup {
    config: PipelineConfig,
    palette: Palette,
    inputs: Vec<SpriteInput>,
}

fn setup(cli: &Cli) -> Result<Setup, ConfigError> {
    let config = cli::config_from_cli(cli)?;
    let palette = config::load_palette(cli.palette.as_deref())?;
    // A palette the config cannot use fails the run, not each sprite.
    drop(config.resolve_palette(&palette)?);
    let inputs = config::collect_inputs(&cli.inputs)?;
    config::prepare_out_dir(&cli.out_dir)?;
    log::debug!("config: {config:?}");
    Ok(Setup {
        config,
        palette,
        inputs,
    })
}

struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Per-sprite reports followed by per-stage means across the batch.
#[allow(clippy::cast_precision_loss)]
fn print_diagnostics(runs: &[SpriteRun]) {
    let all: Vec<(&str, &PipelineDiagnostics)> = runs
        .iter()
        .filter_map(|r| r.diagnostics.as_ref().map(|d| (r.name.as_str(), d)))
        .collect();

    for (name, diagnostics) in &all {
        eprintln!("== {name} ==");
        eprintln!("{}", diagnostics.report());
    }

    if all.len() < 2 {
        return;
    }

    eprintln!("Summary ({} sprites)\n{}", all.len(), "=".repeat(60));

    let totals: Vec<f64> = all
        .iter()
        .map(|(_, d)| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = totals.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = totals.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    eprintln!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    eprintln!();
    eprintln!("{:<24} {:>12}", "Stage", "Mean (ms)");
    eprintln!("{}", "-".repeat(40));

    // One config per run, so every sprite ran the same stages in the same order.
    let mut per_stage: Vec<(&str, Vec<f64>)> = Vec::new();
    for (_, diagnostics) in &all {
        for (name, stage) in diagnostics.stages() {
            let ms = stage.duration.as_secs_f64() * 1000.0;
            match per_stage.iter_mut().find(|(n, _)| *n == name) {
                Some((_, durations)) => durations.push(ms),
                None => per_stage.push((name, vec![ms])),
            }
        }
    }

    for (name, durations) in &per_stage {
        let stage_mean = durations.iter().sum::<f64>() / durations.len() as f64;
        eprintln!("{name:<24} {stage_mean:>10.3}ms");
    }
}
