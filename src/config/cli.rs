//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::config::loader::{finalize, load_config, ConfigError};
use crate::config::schema::BalancerConfig;

#[derive(Debug, Parser)]
#[command(name = "tiny-balancer")]
#[command(about = "Round-robin HTTP load balancer with health probing and failover", long_about = None)]
pub struct Cli {
    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Comma-separated backend base URLs, e.g. http://10.0.0.1:8080,http://10.0.0.2:8080
    #[arg(short, long, value_delimiter = ',')]
    pub backends: Vec<String>,

    /// Optional TOML configuration file. Flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Health probe interval in seconds.
    #[arg(long)]
    pub health_interval: Option<u64>,
}

impl Cli {
    /// Assemble and validate the effective configuration.
    pub fn into_config(self) -> Result<BalancerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BalancerConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        let backends: Vec<String> = self
            .backends
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if !backends.is_empty() {
            config.backends = backends;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(secs) = self.health_interval {
            config.health_check.interval_secs = secs;
        }

        finalize(config)
    }
}
