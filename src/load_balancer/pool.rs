//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered, fixed-size list of backends built at startup
//! - Apply the load balancing algorithm to select a backend
//! - Demote or revive a backend by address

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::validation::{parse_backend_url, ValidationError};
use crate::config::BalancerConfig;
use crate::http::proxy::upstream_client;
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin, LoadBalancer};

/// Errors raised while building a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("a server pool needs at least one backend")]
    Empty,

    #[error(transparent)]
    InvalidBackend(#[from] ValidationError),
}

/// The set of backends traffic is balanced across.
#[derive(Debug)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl ServerPool {
    /// Build a round-robin pool over the given backends.
    pub fn new(backends: Vec<Arc<Backend>>) -> Result<Self, PoolError> {
        Self::with_balancer(backends, Box::new(RoundRobin::new()))
    }

    pub fn with_balancer(
        backends: Vec<Arc<Backend>>,
        balancer: Box<dyn LoadBalancer>,
    ) -> Result<Self, PoolError> {
        if backends.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self { backends, balancer })
    }

    /// Build the pool described by the configuration, sharing one upstream client.
    pub fn from_config(config: &BalancerConfig) -> Result<Self, PoolError> {
        let client = upstream_client(config.timeouts.connect());
        let exchange_timeout = config.timeouts.upstream();

        let backends = config
            .backends
            .iter()
            .map(|raw| -> Result<Arc<Backend>, PoolError> {
                let url = parse_backend_url(raw)?;
                tracing::info!(backend = %url, "Backend registered");
                Ok(Arc::new(Backend::new(url, client.clone(), exchange_timeout)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(backends)
    }

    /// Select the next live backend.
    pub fn select_next(&self) -> Option<Arc<Backend>> {
        let selected = self.balancer.next_server(&self.backends);
        if selected.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No live backends in pool");
        }
        selected
    }

    /// Set the liveness of the backend with the given address.
    /// Returns its previous liveness, or `None` when no backend has that address.
    pub fn mark_backend(&self, url: &Url, live: bool) -> Option<bool> {
        self.backends
            .iter()
            .find(|b| b.url() == url)
            .map(|backend| backend.set_live(live))
    }

    /// All backends in pool order (for health probing).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently marked live.
    pub fn live_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_live()).count()
    }
}
