//! CLI entry point for labhost
//!
//! ```bash
//! # Validate a configuration file
//! labhost check --config config/labhost.toml
//!
//! # Compose services and print the registrations
//! labhost compose --config config/labhost.toml --json
//!
//! # Run the resolution strategies for a module identity
//! labhost probe "omega, version=0.1.0" --active-dir /opt/lab/plugins
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use labhost::config::{HostConfig, DEFAULT_CONFIG_PATH};
use labhost::{logging, Host, HostError, Resolution, ServiceProvider};
use lab_plugin_api::adapter::{ComponentAdapter, SensorAdapter, SENSOR_ADAPTER};
use lab_plugin_api::ServiceLocator;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "labhost")]
#[command(about = "Laboratory instrument host with runtime plugin composition", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    Check,

    /// Compose every auto-loaded dependency and collection
    Compose {
        /// Print registrations as JSON
        #[arg(long)]
        json: bool,

        /// Construct each registered service after composing
        #[arg(long)]
        activate: bool,
    },

    /// Run the resolution strategies for a module identity
    Probe {
        /// Module identity, e.g. "omega, version=0.1.0"
        identity: String,

        /// Active directory to probe last
        #[arg(long)]
        active_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = HostConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    logging::init_from_config(&config).map_err(HostError::Logging)?;

    match cli.command {
        Commands::Check => check(config),
        Commands::Compose { json, activate } => compose(config, json, activate).await,
        Commands::Probe {
            identity,
            active_dir,
        } => probe(config, &identity, active_dir),
    }
}

fn check(config: HostConfig) -> Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    println!("Configuration OK: {}", config.application.name);
    println!("  search path: {}", config.search_path());
    for dependency in &config.dependencies {
        println!(
            "  {} -> {} ({}, {}{})",
            dependency.interface_name,
            dependency.class_name,
            dependency.lifetime,
            dependency.primary_location.display(),
            if dependency.auto_load { ", auto" } else { "" }
        );
    }
    for entry in &config.collections {
        println!("  collection {}<{}>", entry.collection, entry.element);
    }
    Ok(())
}

async fn compose(config: HostConfig, json: bool, activate: bool) -> Result<()> {
    let host = Host::new(config)?;
    let composition = host.compose()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&composition.summaries())?);
    } else {
        for registration in composition.services().registrations() {
            println!("{registration}");
        }
    }

    if activate {
        activate_services(&composition.build_provider()).await?;
    }
    Ok(())
}

async fn activate_services(provider: &ServiceProvider) -> Result<()> {
    let scope = provider.create_scope();
    for interface in provider.interfaces() {
        scope
            .resolve_instance(interface)
            .with_context(|| format!("Failed to activate {interface}"))?;
        println!("activated {interface}");
    }

    if provider.registration(SENSOR_ADAPTER).is_some() {
        let sensor = scope.resolve::<dyn SensorAdapter>(SENSOR_ADAPTER)?;
        sensor.connect().await?;
        sensor.initialize().await?;
        println!("{SENSOR_ADAPTER} reading: {}", sensor.scan().await?);
        sensor.shutdown().await?;
    }
    Ok(())
}

fn probe(config: HostConfig, identity: &str, active_dir: Option<PathBuf>) -> Result<()> {
    let host = Host::new(config)?;
    match host.probe(identity, active_dir.as_deref()) {
        Resolution::Resolved(module) => {
            println!("{} -> {}", module.identity(), module.path().display());
        }
        Resolution::Unresolved | Resolution::Continue => println!("{identity}: unresolved"),
    }
    Ok(())
}
