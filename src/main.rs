//! sgcache gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                  GATEWAY                     │
//!    Client Request        │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!    ──────────────────────┼─▶│  http   │──▶│   rpc    │──▶│ handlers  │  │
//!                          │  │ server  │   │ dispatch │   │ + cache   │  │
//!                          │  └────┬────┘   └────┬─────┘   └───────────┘  │
//!                          │       │ files       │ unknown / passthrough  │
//!                          │       ▼             ▼                        │
//!                          │  ┌─────────────────────────┐                 │
//!    Client Response       │  │ proxy (stream, headers) │                 │
//!    ◀─────────────────────┼──│   upstream client       │◀────────────────┼──── Fallback
//!                          │  └─────────────────────────┘                 │      Server
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use sgcache_gateway::config::{self, GatewayConfig};
use sgcache_gateway::lifecycle::{signals, startup, Shutdown};
use sgcache_gateway::observability::{logging, metrics};
use sgcache_gateway::{GatewayError, HttpServer};

#[derive(Parser)]
#[command(name = "sgcache-gateway")]
#[command(about = "Caching gateway in front of an api3 JSON-RPC server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "SGCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long, env = "SGCACHE_BIND")]
    bind: Option<String>,

    /// Override the fallback server base URL.
    #[arg(short, long, env = "SGCACHE_FALLBACK_URL")]
    fallback: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

fn load(cli: &Cli) -> Result<GatewayConfig, GatewayError> {
    let mut config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(fallback) = &cli.fallback {
        config.upstream.base_url = fallback.clone();
    }
    Ok(config::finalize(config)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("sgcache-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The cache must be ready before the first request is accepted.
    let registry = startup::build_registry(&config)?;
    let server = HttpServer::new(config, registry)?;
    let listener = startup::bind_listener(server.config()).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_termination().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
