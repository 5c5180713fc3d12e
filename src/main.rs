//! tiny-balancer
//!
//! A round-robin HTTP load balancer built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!  Client ──▶ http::server ──▶ resilience::retries ──▶ load_balancer::pool
//!                 ▲                    │                 (round robin over
//!                 │                    ▼                  live backends)
//!                 │            load_balancer::backend           ▲
//!                 └─ response ─ http::proxy ──▶ upstream        │ set_live
//!                                                               │
//!                                             health::active (periodic TCP probe)
//! ```
//!
//! # Usage
//!
//! ```text
//! tiny-balancer --port 3030 --backends http://127.0.0.1:8081,http://127.0.0.1:8082
//! ```

use clap::Parser;

use tiny_balancer::config::cli::Cli;
use tiny_balancer::lifecycle::startup;
use tiny_balancer::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let fallback_level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());
    let config = cli.into_config();

    let level = config
        .as_ref()
        .map(|c| c.observability.log_level.as_str())
        .unwrap_or(&fallback_level);
    init_logging(level);

    tracing::info!("tiny-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
