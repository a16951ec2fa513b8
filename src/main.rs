//! Inbound panel (v1)
//!
//! Admin API for proxy inbounds that restarts the proxy engine when the
//! inbound set changes, at most once per scheduler interval.
//!
//! # Architecture Overview
//!
//! ```text
//!   admin request
//!        │
//!        ▼
//!  ┌───────────┐   ┌──────────────┐   ┌─────────────┐
//!  │  admin    │──▶│   gateway    │──▶│ config store │
//!  │ (axum)    │   │ validate/stamp│   │ (durable)   │
//!  └───────────┘   └──────┬───────┘   └──────┬──────┘
//!                         │ mark_dirty         │ enabled inbounds
//!                         ▼                    ▼
//!                  ┌──────────────┐     ┌─────────────┐
//!                  │ restart flag │◀────│  scheduler  │──▶ engine process
//!                  └──────────────┘     │ every 10s   │
//!                                       └─────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use inbound_panel::config::{load_config, PanelConfig};
use inbound_panel::lifecycle;
use inbound_panel::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "inbound-panel")]
#[command(about = "Proxy inbound management panel", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => PanelConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "inbound-panel starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        restart_interval_secs = config.scheduler.restart_interval_secs,
        engine_binary = ?config.engine.binary,
        "Configuration loaded"
    );

    lifecycle::run(config, args.config.as_deref()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
