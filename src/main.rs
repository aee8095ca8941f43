//! chain-connect
//!
//! Command-line front end for the wallet connection core.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ AppConfig ──▶ ChainConfigBuilder ──▶ ConnectorRegistry
//!                                                            │
//!                                   ┌────────────────────────┼────────────────────────┐
//!                                   ▼                        ▼                        ▼
//!                          ConnectionManager        ConnectionManager        ConnectionManager
//!                               (UTXO)                  (Cosmos)                  (EVM)
//!                                                            │                        ▲
//!                                               ConnectionEvent                SharedConfigSlot
//!                                                            ▼
//!                                                  RpcConnectionManager ◀── visibility reconnect
//! ```

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use chain_connect::config::watcher::ConfigWatcher;
use chain_connect::config::{apply_env_overrides, load_config, AppConfig};
use chain_connect::lifecycle::signals::wait_for_shutdown_signal;
use chain_connect::lifecycle::{apply_config_update, build_hub, default_catalog, Shutdown};
use chain_connect::observability::logging::{init_logging, LogLevelHandle};
use chain_connect::observability::metrics::init_metrics;
use chain_connect::ChainFamily;

#[derive(Parser)]
#[command(name = "chain-connect")]
#[command(about = "Multi-chain wallet connection core", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connectors and network configuration per family
    Registry,
    /// Connect the Cosmos RPC clients and print node status
    RpcCheck,
    /// Build the hub, resume saved sessions and wait for a shutdown signal
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config);
    let logging = init_logging(&config.observability);

    tracing::info!(
        profile = config.network.profile.as_str(),
        families = ?config.network.families,
        "chain-connect v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let catalog = default_catalog();

    match cli.command {
        Commands::Registry => {
            let hub = build_hub(&config, &catalog)?;
            let registry = hub.registry();
            let families: Vec<_> = registry
                .families()
                .filter_map(|family| {
                    let entry = registry.entry(family)?;
                    Some(json!({
                        "family": family,
                        "network": entry.network,
                        "connectors": entry.connectors.iter().map(|m| json!({
                            "id": m.id,
                            "name": m.display_name,
                            "docs_url": m.docs_url,
                            "requires_shared_config": m.requires_shared_config,
                        })).collect::<Vec<_>>(),
                    }))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&families)?);
        }
        Commands::RpcCheck => {
            let hub = build_hub(&config, &catalog)?;
            let Some(rpc) = hub.rpc() else {
                eprintln!("Error: Cosmos RPC is disabled or the cosmos family is not configured");
                std::process::exit(1);
            };

            match hub.start_rpc(config.rpc.retry_policy()).await {
                Some(Ok(clients)) => {
                    let height = clients.typed.height().await?;
                    let block = clients.typed.block(Some(height)).await?;
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "endpoint": rpc.snapshot().endpoint,
                            "chain_id": clients.typed.chain_id(),
                            "height": height,
                            "block_hash": block.hash,
                            "block_time": block.time,
                        }))?
                    );
                }
                Some(Err(e)) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
                None => {
                    eprintln!("Error: no Cosmos RPC endpoint configured");
                    std::process::exit(1);
                }
            }
            hub.teardown().await;
        }
        Commands::Run => run(config, cli.config, catalog, logging).await?,
    }

    Ok(())
}

async fn run(
    config: AppConfig,
    config_path: Option<PathBuf>,
    catalog: chain_connect::ConnectorCatalog,
    logging: LogLevelHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let hub = build_hub(&config, &catalog)?;
    let shutdown = Shutdown::new();

    for (family, result) in hub.resume_sessions().await {
        match result {
            Ok(state) => tracing::info!(%family, address = ?state.address(), "Session resumed"),
            Err(e) => tracing::warn!(%family, error = %e, "Session not resumed"),
        }
    }

    if let Some(Err(e)) = hub.start_rpc(config.rpc.retry_policy()).await {
        tracing::warn!(error = %e, "Cosmos RPC unavailable, continuing without read path");
    }

    // Keep the watcher alive for the lifetime of the run.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(&path);
            let mut signal = shutdown.subscribe();
            let settings = hub.settings().clone();
            let mut current = config.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = signal.recv() => break,
                        update = updates.recv() => {
                            let Some(update) = update else { break };
                            apply_config_update(&settings, Some(&logging), &current, &update);
                            current.connection = update.connection;
                            current.observability.log_level = update.observability.log_level;
                        }
                    }
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    for manager in hub.managers() {
        tracing::info!(
            family = %manager.family(),
            network = %manager.network().network,
            status = manager.status().as_str(),
            "Wallet connection ready"
        );
    }
    if hub.manager(ChainFamily::Evm).is_some() && !hub.shared_config().has() {
        tracing::debug!("EVM connectors requiring shared configuration wait for the host");
    }

    wait_for_shutdown_signal().await;
    shutdown.trigger();
    hub.teardown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
