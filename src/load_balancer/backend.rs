//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Own the liveness flag behind a reader/writer lock
//! - Own the reverse proxy bound to the upstream address

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, Response};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use crate::http::proxy::{ForwardError, ReverseProxy, UpstreamClient};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Canonical base URL of the upstream.
    url: Url,
    /// Liveness flag. Many readers, one writer at a time.
    live: RwLock<bool>,
    /// Forwarding proxy bound to `url`.
    proxy: ReverseProxy,
}

impl Backend {
    /// Create a backend that starts out live.
    pub fn new(url: Url, client: UpstreamClient, exchange_timeout: Duration) -> Self {
        let proxy = ReverseProxy::new(&url, client, exchange_timeout);
        Self {
            url,
            live: RwLock::new(true),
            proxy,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Network address used for liveness probes (`host:port`).
    pub fn probe_address(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        let port = self.url.port_or_known_default().unwrap_or(80);
        format!("{}:{}", host, port)
    }

    pub fn is_live(&self) -> bool {
        *self.live.read()
    }

    /// Set the liveness flag, returning the previous value.
    pub fn set_live(&self, live: bool) -> bool {
        std::mem::replace(&mut *self.live.write(), live)
    }

    /// Forward one copy of a request through this backend's proxy.
    pub async fn forward(
        &self,
        head: &Parts,
        body: Bytes,
        peer: Option<SocketAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        self.proxy.forward(head, body, peer).await
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.proxy.authority())
    }
}
