//! CLI entry point for the harvest engine.
//!
//! The external scheduler is whatever invokes this binary (cron, a task
//! runner); `rebalance`, `buy`, and `report` each run one checkpoint
//! against a day snapshot, in that order, once per trading day.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use harvest_engine::audit::AuditLog;
use harvest_engine::config::Config;
use harvest_engine::engine::Engine;
use harvest_engine::error::{Error, Result};
use harvest_engine::registry::Registry;
use harvest_engine::snapshot::{DaySnapshot, SnapshotHost};
use harvest_engine::universe::Universe;

#[derive(Parser)]
#[command(name = "harvester")]
#[command(about = "Daily rebalancing and tax-loss harvesting for a fixed basket")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the registry state file from a universe file
    Init {
        /// Path to universe.json
        universe: PathBuf,

        /// Overwrite an existing state file without asking
        #[arg(long)]
        force: bool,
    },

    /// Run the rebalance/harvest checkpoint
    Rebalance {
        /// Path to the day snapshot JSON
        snapshot: PathBuf,
    },

    /// Run the buy-sizing checkpoint
    Buy {
        /// Path to the day snapshot JSON
        snapshot: PathBuf,
    },

    /// Run the end-of-day report checkpoint
    Report {
        /// Path to the day snapshot JSON
        snapshot: PathBuf,
    },

    /// Run all three checkpoints in order
    Cycle {
        /// Path to the day snapshot JSON
        snapshot: PathBuf,

        /// Compute and display without persisting registry state
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt (for automation/cron)
        #[arg(long)]
        yes: bool,
    },

    /// Show the persisted registry
    Status,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init { universe, force } => init(&config, &universe, force),
        Command::Rebalance { snapshot } => rebalance(&config, &snapshot),
        Command::Buy { snapshot } => buy(&config, &snapshot),
        Command::Report { snapshot } => report(&config, &snapshot),
        Command::Cycle {
            snapshot,
            dry_run,
            yes,
        } => cycle(&config, &snapshot, dry_run, yes),
        Command::Status => status(&config),
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn init(config: &Config, universe_path: &PathBuf, force: bool) -> Result<()> {
    let universe = Universe::load(universe_path)?;
    let state_path = config.state_path();

    if state_path.exists() && !force {
        let overwrite = dialoguer::Confirm::new()
            .with_prompt(format!(
                "State file {} exists. Overwrite?",
                state_path.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !overwrite {
            return Err(Error::Aborted("Aborted.".into()));
        }
    }

    let registry = Registry::from_universe(&universe);
    registry.save(&state_path)?;
    println!(
        "Initialized {} assets. State written to {}",
        registry.len(),
        state_path.display()
    );
    print!("{registry}");
    Ok(())
}

fn load_engine(config: &Config) -> Result<Engine> {
    let registry = Registry::load(&config.state_path())?;
    Ok(Engine::new(config.engine.clone(), registry))
}

fn open_host(path: &PathBuf) -> Result<SnapshotHost> {
    Ok(SnapshotHost::new(DaySnapshot::load(path)?))
}

fn rebalance(config: &Config, snapshot: &PathBuf) -> Result<()> {
    let mut engine = load_engine(config)?;
    let host = open_host(snapshot)?;
    let mut audit = AuditLog::open(&config.audit_path())?;

    let summary = engine.rebalance_checkpoint(&host, &mut audit)?;
    engine.registry().save(&config.state_path())?;

    display_planned(&host);
    if summary.is_quiet() {
        println!("No rebalancing actions today.");
    }
    Ok(())
}

fn buy(config: &Config, snapshot: &PathBuf) -> Result<()> {
    let engine = load_engine(config)?;
    let host = open_host(snapshot)?;
    let mut audit = AuditLog::open(&config.audit_path())?;

    let buys = engine.buy_checkpoint(&host, &mut audit)?;
    display_planned(&host);
    if buys.is_empty() {
        println!("No buys today.");
    }
    Ok(())
}

fn report(config: &Config, snapshot: &PathBuf) -> Result<()> {
    let engine = load_engine(config)?;
    let host = open_host(snapshot)?;
    let mut audit = AuditLog::open(&config.audit_path())?;

    let daily = engine.report_checkpoint(&host, &mut audit)?;
    print!("{daily}");
    Ok(())
}

fn cycle(config: &Config, snapshot: &PathBuf, dry_run: bool, yes: bool) -> Result<()> {
    let mut engine = load_engine(config)?;
    let host = open_host(snapshot)?;
    let mut audit = AuditLog::open(&config.audit_path())?;

    if !dry_run && !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Run the full daily cycle and persist registry state?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            return Err(Error::Aborted("Aborted.".into()));
        }
    }

    let outcome = engine.run_cycle(&host, &mut audit)?;

    display_planned(&host);
    print!("{}", outcome.report);

    if dry_run {
        println!("\n[DRY RUN] Registry state not persisted.");
    } else {
        engine.registry().save(&config.state_path())?;
        println!("\nState written to {}", config.state_path().display());
    }
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let registry = Registry::load(&config.state_path())?;
    println!("REGISTRY ({} assets):", registry.len());
    print!("{registry}");
    Ok(())
}

fn display_planned(host: &SnapshotHost) {
    let planned = host.planned_orders();
    if planned.is_empty() {
        return;
    }
    println!("PLANNED ORDERS:");
    for (i, order) in planned.iter().enumerate() {
        println!("  {:>3}  {order}", i + 1);
    }
}
