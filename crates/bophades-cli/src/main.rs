//! Bophades CLI - boot a configured protocol and inspect its state
//!
//! Configuration comes from `--config`, `BOPHADES_CONFIG`, `config/default`
//! and `BOPHADES__*` variables (see `bophades_state::ProtocolConfig`).
//!
//! # Quick Start
//!
//! ```bash
//! bophades snapshot
//! bophades metrics --json
//! bophades --config protocol.toml treasury
//! bophades observe --advance 3600
//! bophades events --name CategoryAdded --limit 5
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bophades_ledger::Erc20;
use bophades_policies::Observations;
use bophades_state::{Protocol, ProtocolConfig};

mod display;

use display::{Amount, Status};

/// Bophades CLI - Kernel, modules and policies of the Olympus protocol
#[derive(Parser)]
#[command(name = "bophades")]
#[command(author = "Bophades Contributors")]
#[command(version)]
#[command(about = "Boot a Bophades protocol from configuration and report its state", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (falls back to BOPHADES_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Print JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Everything below in one report
    Snapshot,

    /// Current SPPLY metrics
    Metrics,

    /// SPPLY categories with their supply and locations
    Supply,

    /// TRSRY assets with balances, debt and categories
    Treasury,

    /// Bridge pool state
    Bridge,

    /// Advance the clock, then store every metric, category and asset balance
    Observe {
        /// Seconds to advance before storing
        #[arg(long, default_value = "0")]
        advance: u64,
    },

    /// Kernel event log
    Events {
        /// Only events with this name
        #[arg(long)]
        name: Option<String>,

        /// Most recent N events
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config_path = cli.config.clone().or_else(|| std::env::var("BOPHADES_CONFIG").ok());
    debug!(config = ?config_path, "loading configuration");
    let config = ProtocolConfig::load(config_path.as_deref())?;

    let protocol = match Protocol::boot(config) {
        Ok(protocol) => protocol,
        Err(err) => {
            display::status(Status::Fail, &format!("boot failed [{}]: {}", err.error_code(), err));
            return Err(err.into());
        }
    };

    match cli.command {
        Commands::Snapshot => {
            let snapshot = protocol.snapshot()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_header(&protocol);
                print_metrics(&protocol)?;
                print_supply(&protocol)?;
                print_treasury(&protocol)?;
                print_bridge(&protocol);
                display::heading("Deposits");
                display::row("Positions", snapshot.positions);
                display::row("Events", snapshot.events);
            }
        }

        Commands::Metrics => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&protocol.metrics()?)?);
            } else {
                print_metrics(&protocol)?;
            }
        }

        Commands::Supply => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&protocol.supply_categories()?)?);
            } else {
                print_supply(&protocol)?;
            }
        }

        Commands::Treasury => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&protocol.treasury_assets()?)?);
            } else {
                print_treasury(&protocol)?;
            }
        }

        Commands::Bridge => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&protocol.bridge_report())?);
            } else {
                print_bridge(&protocol);
            }
        }

        Commands::Observe { advance } => {
            protocol.kernel.clock().advance(advance);
            let observations = protocol.store_observations()?;
            let balances = protocol.store_balances()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "observations": observations,
                        "balances": balances,
                    }))?
                );
            } else {
                print_observations(&observations);
                display::heading("Stored Asset Balances");
                for (asset, cache) in &balances {
                    let token = protocol.tokens.get(asset)?;
                    display::row(token.symbol(), Amount::of(cache.value, token.decimals(), token.symbol()));
                }
            }
        }

        Commands::Events { name, limit } => {
            let log = protocol.kernel.events();
            let events = match &name {
                Some(name) => log.named(name),
                None => log.events(),
            };
            let skip = events.len().saturating_sub(limit);
            let recent = &events[skip..];
            if cli.json {
                println!("{}", serde_json::to_string_pretty(recent)?);
            } else {
                display::heading(&format!("Events ({} of {})", recent.len(), events.len()));
                for event in recent {
                    println!(
                        "  {} {} {}",
                        event.timestamp.to_string().bright_black(),
                        event.name.bright_white(),
                        event.emitter.short().bright_black()
                    );
                    display::detail("data", &event.data);
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Initialization
// =============================================================================

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

// =============================================================================
// Reports
// =============================================================================

fn print_header(protocol: &Protocol) {
    display::heading("Kernel");
    display::row("Address", protocol.kernel.address());
    display::row("Executor", protocol.kernel.executor());
    display::row("Timestamp", protocol.kernel.now());
    display::row("Active policies", protocol.kernel.active_policies().len());
}

fn print_metrics(protocol: &Protocol) -> anyhow::Result<()> {
    display::heading("Supply Metrics");
    for report in protocol.metrics()? {
        display::row(&report.metric.to_string(), Amount::ohm(report.value));
    }
    Ok(())
}

fn print_supply(protocol: &Protocol) -> anyhow::Result<()> {
    display::heading("Supply Categories");
    for report in protocol.supply_categories()? {
        display::row(&report.category.to_string(), Amount::ohm(report.supply));
        for location in &report.locations {
            display::detail("location", location);
        }
    }
    Ok(())
}

fn print_treasury(protocol: &Protocol) -> anyhow::Result<()> {
    display::heading("Treasury Assets");
    let assets = protocol.treasury_assets()?;
    if assets.is_empty() {
        display::status(Status::Note, "no assets approved");
    }
    for asset in assets {
        println!("  {} {}", asset.symbol.bright_white().bold(), asset.address.short().bright_black());
        display::detail("balance", Amount::of(asset.balance, asset.decimals, &asset.symbol));
        display::detail("reserves", Amount::bare(asset.reserve_balance, asset.decimals));
        if asset.total_debt > 0 {
            display::detail("debt", Amount::bare(asset.total_debt, asset.decimals));
        }
        let categories: Vec<String> = asset.categories.iter().map(|category| category.to_string()).collect();
        display::detail("categories", categories.join(", "));
        for location in &asset.locations {
            display::detail("location", location);
        }
    }
    Ok(())
}

fn print_bridge(protocol: &Protocol) {
    display::heading("Bridge");
    let Some(report) = protocol.bridge_report() else {
        display::status(Status::Note, "no bridge relayer configured");
        return;
    };
    if report.enabled {
        display::status(Status::Ok, "enabled");
    } else {
        display::status(Status::Warn, "disabled");
    }
    display::row("Bridged", Amount::ohm(report.bridged_supply));
    display::row("Cross-chain supply", Amount::ohm(report.cross_chain_supply));
    if report.failed_messages > 0 {
        display::status(Status::Warn, &format!("{} failed messages parked", report.failed_messages));
    }
}

fn print_observations(observations: &Observations) {
    display::heading("Stored Metrics");
    for (metric, cache) in &observations.metrics {
        display::row(&metric.to_string(), format!("{} @ {}", Amount::ohm(cache.value), cache.timestamp));
    }
    display::heading("Stored Categories");
    for (category, cache) in &observations.categories {
        display::row(&category.to_string(), format!("{} @ {}", Amount::ohm(cache.value), cache.timestamp));
    }
}
