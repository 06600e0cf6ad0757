#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for construction-zone risk scoring.
//!
//! Every command prints pretty JSON on stdout. Logs go to stderr and are
//! controlled with `RUST_LOG`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use urban_risk_config::RiskConfig;
use urban_risk_engine::{InMemoryStore, RiskEngine};
use urban_risk_models::{PermitRequest, SimulationParams};

/// Environment variable naming a configuration table file.
const CONFIG_ENV: &str = "URBAN_RISK_CONFIG";

#[derive(Parser)]
#[command(name = "urban_risk", about = "Construction-zone risk scoring and permit decisions")]
struct Cli {
    /// Configuration table file (overrides `URBAN_RISK_CONFIG`; defaults to
    /// the embedded Montréal table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a zone from a territory snapshot
    Score {
        /// Territory snapshot (JSON)
        territory: PathBuf,
        /// Zone code (e.g., "VM")
        zone: String,
    },
    /// Evaluate a permit request against a territory snapshot
    Evaluate {
        /// Territory snapshot (JSON)
        territory: PathBuf,
        /// Permit request (JSON)
        request: PathBuf,
    },
    /// Run what-if scenarios
    Simulate {
        /// Simulation parameters (JSON), or a permit request when
        /// `--territory` is given
        params: PathBuf,
        /// Territory snapshot to read the zone's score, activity and flows
        /// from
        #[arg(long)]
        territory: Option<PathBuf>,
    },
    /// Report zone utilization, impacted corridors and planning
    /// recommendations for a territory snapshot
    Report {
        /// Territory snapshot (JSON)
        territory: PathBuf,
    },
    /// Classify a 0-100 score into a severity band
    Classify {
        /// Score to classify
        score: f64,
    },
    /// List configured zones and protected corridors
    Zones,
    /// Load and validate the configuration table
    CheckConfig,
}

fn load_config(path: Option<PathBuf>) -> Result<RiskConfig, Box<dyn std::error::Error>> {
    let path = path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    Ok(match path {
        Some(path) => RiskConfig::load(path)?,
        None => RiskConfig::embedded()?,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {e}", path.display()))?)
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn engine(
    config: RiskConfig,
    territory: &Path,
) -> Result<RiskEngine<InMemoryStore>, Box<dyn std::error::Error>> {
    let territory = urban_risk_source::load_territory(territory)?;
    let store = InMemoryStore::from_territory(&config, &territory)?;
    Ok(RiskEngine::new(config, store)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = load_config(cli.config)?;

    match command {
        Commands::Score { territory, zone } => {
            let engine = engine(config, &territory)?;
            print_json(&engine.score_zone(&zone)?)?;
        }
        Commands::Evaluate { territory, request } => {
            let request: PermitRequest = read_json(&request)?;
            let engine = engine(config, &territory)?;
            print_json(&engine.evaluate_permit(&request)?)?;
        }
        Commands::Simulate {
            params,
            territory: Some(territory),
        } => {
            let request: PermitRequest = read_json(&params)?;
            let engine = engine(config, &territory)?;
            print_json(&engine.simulate_permit(&request)?)?;
        }
        Commands::Simulate {
            params,
            territory: None,
        } => {
            let params: SimulationParams = read_json(&params)?;
            let scenarios = urban_risk_engine::simulator::simulate(
                &params,
                &config.coactivity,
                &config.simulation,
            )?;
            print_json(&scenarios)?;
        }
        Commands::Report { territory } => {
            let engine = engine(config, &territory)?;
            print_json(&engine.territory_report()?)?;
        }
        Commands::Classify { score } => {
            if !(0.0..=100.0).contains(&score) {
                return Err(format!("Score must be within 0-100, got {score}").into());
            }
            print_json(&urban_risk_engine::severity::classify(score, &config.severity))?;
        }
        Commands::Zones => {
            println!("{:<6} {:<45} {:>8}", "CODE", "NAME", "CAPACITY");
            println!("{}", "-".repeat(61));
            for zone in &config.zones {
                println!("{:<6} {:<45} {:>8}", zone.code, zone.name, zone.capacity);
            }
            println!();
            println!("{:<14} {:<11} {:>8}  ZONES", "CORRIDOR", "CATEGORY", "PRIORITY");
            println!("{}", "-".repeat(61));
            for corridor in &config.corridors {
                println!(
                    "{:<14} {:<11} {:>8}  {}",
                    corridor.id,
                    corridor.category,
                    corridor.priority,
                    corridor.zones.join(", ")
                );
            }
        }
        Commands::CheckConfig => {
            log::info!("Configuration {} is valid", config.version);
            print_json(&serde_json::json!({
                "version": config.version,
                "zones": config.zones.len(),
                "corridors": config.corridors.len(),
                "seasons": config.seasons.len(),
                "embeddedTables": urban_risk_config::table_names(),
            }))?;
        }
    }

    Ok(())
}
