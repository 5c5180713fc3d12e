//! Active health probing.
//!
//! # Responsibilities
//! - Periodically probe every backend with a TCP connect
//! - Update backend liveness based on results

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::{backend::Backend, pool::ServerPool};
use crate::observability::metrics;

/// Outcome of one probe tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub live: usize,
    pub dead: usize,
}

pub struct HealthProber {
    pool: Arc<ServerPool>,
    interval: Duration,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self {
            pool,
            interval: config.interval(),
            timeout: config.timeout(),
        }
    }

    /// Probe on every tick until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            backends = self.pool.len(),
            "Health prober starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.probe_all().await;
                    tracing::debug!(live = summary.live, dead = summary.dead, "Health probe tick complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once. A failed probe never stops the others.
    pub async fn probe_all(&self) -> ProbeSummary {
        let results = join_all(self.pool.backends().iter().map(|b| self.probe(b))).await;

        let live = results.iter().filter(|&&live| live).count();
        ProbeSummary {
            live,
            dead: results.len() - live,
        }
    }

    async fn probe(&self, backend: &Backend) -> bool {
        let addr = backend.probe_address();
        let reachable = match time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend, error = %e, "Health probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend, timeout = ?self.timeout, "Health probe failed: timeout");
                false
            }
        };

        let was_live = backend.set_live(reachable);
        if was_live != reachable {
            if reachable {
                tracing::info!(backend = %backend, "Backend is live again");
            } else {
                tracing::warn!(backend = %backend, "Backend marked dead by health probe");
            }
        }
        metrics::record_backend_liveness(&backend.to_string(), reachable);

        reachable
    }
}
