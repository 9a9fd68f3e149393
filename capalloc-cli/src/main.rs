//! Capalloc CLI — run allocation passes from scenario files.
//!
//! Commands:
//! - `plan` — one `adjust_funds` pass, printed as JSON or CSV
//! - `sweep` — the same scenario under several reserve percentages, in parallel
//! - `fingerprint` — content hash of the engine + allocator configuration

mod scenario;

use anyhow::{bail, Context, Result};
use capalloc_core::allocate::AllocationPath;
use capalloc_core::FundsAdjustment;
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use scenario::Scenario;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "capalloc",
    about = "Capalloc CLI — capital allocation across trading systems"
)]
struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one allocation pass and print the resulting adjustment.
    Plan {
        /// Path to a scenario TOML file.
        #[arg(long)]
        config: PathBuf,

        /// Reject weights outside [0, 1] (NaN included) instead of passing them through.
        #[arg(long, default_value_t = false)]
        validate: bool,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Run the scenario once per reserve percentage.
    Sweep {
        /// Path to a scenario TOML file.
        #[arg(long)]
        config: PathBuf,

        /// Reserve percentages to try (e.g. --reserve 0 0.1 0.25).
        #[arg(long, num_args = 1.., required = true)]
        reserve: Vec<f64>,
    },
    /// Print the configuration fingerprint.
    Fingerprint {
        /// Path to a scenario TOML file.
        #[arg(long)]
        config: PathBuf,
    },
}

impl Cli {
    fn init_logging(&self) -> Result<()> {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        // stdout carries the JSON/CSV payload
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging()?;

    match cli.command {
        Commands::Plan {
            config,
            validate,
            format,
        } => run_plan(config, validate, format),
        Commands::Sweep { config, reserve } => run_sweep(config, reserve),
        Commands::Fingerprint { config } => run_fingerprint(config),
    }
}

fn run_plan(config: PathBuf, validate: bool, format: OutputFormat) -> Result<()> {
    let mut scenario = Scenario::load(&config)?;
    if validate {
        scenario.engine.params.validate_weights = true;
    }

    let adjustment = plan(&scenario)?;
    let stdout = std::io::stdout();
    match format {
        OutputFormat::Json => {
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &adjustment)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(stdout.lock(), &adjustment)?,
    }
    Ok(())
}

fn plan(scenario: &Scenario) -> Result<FundsAdjustment> {
    let mut engine = scenario.engine()?;
    let adjustment = engine
        .adjust_funds(scenario.date, &scenario.selected, &scenario.running_set())
        .with_context(|| format!("allocation failed for engine '{}'", engine.name()))?;
    Ok(adjustment)
}

/// One CSV line per buy, deferred sell or untouched system.
#[derive(Debug, Serialize)]
struct PlanRow<'a> {
    action: &'static str,
    system: &'a str,
    amount: Option<f64>,
    path: Option<AllocationPath>,
}

fn write_csv<W: Write>(out: W, adjustment: &FundsAdjustment) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for buy in &adjustment.buys {
        writer.serialize(PlanRow {
            action: "buy",
            system: buy.system.as_str(),
            amount: Some(buy.amount),
            path: Some(buy.path),
        })?;
    }
    for sell in &adjustment.deferred_sells {
        writer.serialize(PlanRow {
            action: "deferred_sell",
            system: sell.system.as_str(),
            amount: Some(sell.weight),
            path: Some(AllocationPath::Reconcile),
        })?;
    }
    for system in &adjustment.untouched {
        writer.serialize(PlanRow {
            action: "untouched",
            system: system.as_str(),
            amount: None,
            path: None,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn run_sweep(config: PathBuf, reserves: Vec<f64>) -> Result<()> {
    let scenario = Scenario::load(&config)?;
    let results = sweep(&scenario, &reserves)?;

    println!(
        "{:>8}  {:>14}  {:>14}  {:>14}  {:>6}",
        "reserve", "allocatable", "bought", "deferred", "buys"
    );
    for (reserve, adj) in reserves.iter().zip(&results) {
        let deferred: f64 = adj.deferred_sells.iter().map(|s| s.weight).sum();
        println!(
            "{:>8.4}  {:>14.2}  {:>14.2}  {:>14.2}  {:>6}",
            reserve,
            adj.allocatable,
            adj.total_bought(),
            deferred,
            adj.buys.len()
        );
    }
    Ok(())
}

/// Each reserve gets its own engine clone and its own fresh accounts.
fn sweep(scenario: &Scenario, reserves: &[f64]) -> Result<Vec<FundsAdjustment>> {
    if reserves.is_empty() {
        bail!("sweep needs at least one --reserve value");
    }
    let base = scenario.detached_engine()?;
    let running = scenario.running_set();
    info!(runs = reserves.len(), engine = base.name(), "starting reserve sweep");

    reserves
        .par_iter()
        .map(|&reserve| {
            let mut engine = base.clone();
            engine.set_reserve_percent(reserve);
            scenario.attach_accounts(&mut engine);
            engine
                .adjust_funds(scenario.date, &scenario.selected, &running)
                .with_context(|| format!("sweep run at reserve {reserve} failed"))
        })
        .collect()
}

fn run_fingerprint(config: PathBuf) -> Result<()> {
    let scenario = Scenario::load(&config)?;
    println!("engine  {}", scenario.engine.config_hash()?);
    println!("full    {}", scenario.engine.full_hash(&scenario.allocator)?);
    Ok(())
}
