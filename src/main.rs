//! Dynamic API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐  snapshots  ┌────────────────────┐  model  ┌──────────────────┐
//!   │  providers   │────────────▶│  watcher           │────────▶│  router factory  │
//!   │  (file, ...) │             │  throttle + merge  │         │  rules, chains   │
//!   └──────────────┘             └─────────┬──────────┘         └────────┬─────────┘
//!                                          │ listeners                   │ table
//!                                          ▼                             ▼
//!                                   ┌─────────────┐              ┌──────────────────┐
//!                                   │ operator API│              │  table swap      │
//!                                   └─────────────┘              └────────┬─────────┘
//!                                                                         │ load per request
//!     Client Request   ┌─────────────┐    ┌──────────────┐    ┌──────────┴───┐
//!     ────────────────▶│ entrypoint  │───▶│  middleware  │───▶│ load balancer│───▶ Upstream
//!                      │ server      │    │  chain       │    │ + forward    │
//!                      └─────────────┘    └──────────────┘    └──────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use dynamic_gateway::config::{load_config, GatewayConfig};
use dynamic_gateway::lifecycle::spawn_signal_handler;
use dynamic_gateway::observability::{logging, metrics};
use dynamic_gateway::{Gateway, MiddlewareRegistry, Shutdown};

#[derive(Parser)]
#[command(name = "dynamic-gateway")]
#[command(about = "API gateway with dynamic routing configuration", long_about = None)]
struct Cli {
    /// Static configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dynamic-gateway starting");

    tracing::info!(
        entrypoints = ?config.entrypoint_names(),
        throttle_ms = config.providers.throttle_ms,
        request_timeout_secs = config.timeouts.request_secs,
        api_enabled = config.api.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let gateway = Gateway::new(config, MiddlewareRegistry::with_builtins());
    let running = gateway.start(&shutdown).await?;
    running.wait().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
