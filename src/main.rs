//! Sweeps functional-unit latencies over a simulated multicore and reports throughput per
//! configuration. Also runs the partitioned host DAXPY kernel.

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{self, WrapErr};
use fupool_sweep::config::SweepConfig;
use fupool_sweep::metrics::{best, RunResult};
use fupool_sweep::partition::{compute_scaled_sum, daxpy};
use fupool_sweep::simulator::CycleEngine;
use fupool_sweep::sweep::SweepHarness;
use fupool_sweep::topology::TopologyBuilder;
use fupool_sweep::workload::FileResolver;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// Log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sweep (opLat, issueLat) pairs on the reference engine
    Sweep(SweepArgs),
    /// Run the partitioned DAXPY kernel on the host
    Daxpy(DaxpyArgs),
}

#[derive(Debug, clap::Args)]
struct SweepArgs {
    /// TOML sweep configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Number of simulated cores
    #[arg(long)]
    cores: Option<u32>,
    /// Latency pair to simulate; repeat to sweep several
    #[arg(short, long = "point", value_name = "OP:ISSUE", value_parser = parse_point)]
    points: Vec<(u32, u32)>,
    /// Executable every core runs
    #[arg(short, long, value_name = "PATH")]
    workload: Option<PathBuf>,
    /// Argument passed to the workload; repeatable
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    args: Vec<String>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, clap::Args)]
struct DaxpyArgs {
    #[arg(long, default_value_t = 1 << 20)]
    len: usize,
    #[arg(long, default_value_t = 4)]
    workers: usize,
    #[arg(long, default_value_t = 2.0)]
    scalar: f64,
}

fn parse_point(value: &str) -> Result<(u32, u32), String> {
    let (op, issue) = value
        .split_once(':')
        .ok_or_else(|| format!("expected OP:ISSUE, got {value:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid latency {s:?}: {err}"))
    };
    Ok((parse(op)?, parse(issue)?))
}

#[derive(Serialize)]
struct Report<'a> {
    results: &'a [RunResult],
    best: Option<&'a RunResult>,
}

fn print_report(results: &[RunResult], format: Format) -> eyre::Result<()> {
    match format {
        Format::Json => {
            let report = Report {
                results,
                best: best(results),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => {
            for result in results {
                println!("{result}\n");
            }
            if let Some(winner) = best(results) {
                println!(
                    "Best configuration: opLat = {}, issueLat = {} ({:.3} operations per tick)",
                    winner.params.op_latency, winner.params.issue_latency, winner.throughput
                );
            }
        }
    }
    Ok(())
}

fn sweep(args: SweepArgs) -> eyre::Result<()> {
    let mut config = match &args.config {
        Some(path) => SweepConfig::load(path)
            .wrap_err_with(|| format!("loading sweep configuration {}", path.display()))?,
        None => SweepConfig::default(),
    };
    if let Some(cores) = args.cores {
        config.core_count = cores;
    }
    if !args.points.is_empty() {
        config.configurations = args.points;
    }
    if let Some(path) = args.workload {
        config.workload.path = path;
        config.workload.args = args.args;
    } else if !args.args.is_empty() {
        config.workload.args = args.args;
    }
    log::debug!("{config:#?}");

    let builder = TopologyBuilder::new(config.system.clone(), FileResolver);
    let mut harness = SweepHarness::new(
        CycleEngine::new(config.engine.clone()),
        builder,
        config.workload.clone(),
    )
    .with_assumed_operations(config.assumed_fp_operations);

    match harness.run_sweep(config.core_count, &config.configurations) {
        Ok(results) => print_report(&results, args.format),
        Err(err) => {
            print_report(&err.completed, args.format)?;
            Err(err).wrap_err("sweep aborted")
        }
    }
}

fn run_daxpy(args: DaxpyArgs) -> eyre::Result<()> {
    let x: Vec<f64> = (0..args.len).map(|i| i as f64).collect();
    let mut y = vec![1.0; args.len];
    let mut expected = y.clone();
    daxpy(args.scalar, &x, &mut expected);

    let start = Instant::now();
    compute_scaled_sum(args.scalar, &x, &mut y, args.workers)?;
    let elapsed = start.elapsed();

    eyre::ensure!(
        y == expected,
        "parallel result differs from the sequential baseline"
    );
    println!(
        "DAXPY over {} elements with {} workers took {:?}",
        args.len, args.workers, elapsed
    );
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let options = Options::parse();

    let level = match options.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match options.command {
        Command::Sweep(args) => sweep(args),
        Command::Daxpy(args) => run_daxpy(args),
    }
}
