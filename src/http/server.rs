//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the balancing handler on every path
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Bind server to listener and spawn the health prober
//! - Dispatch requests through the retry/failover policy
//! - Answer 503 when no backend can serve a request

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use thiserror::Error;
use tracing::Instrument;

use crate::config::loader::finalize;
use crate::config::{BalancerConfig, ConfigError};
use crate::health::HealthProber;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::load_balancer::pool::{PoolError, ServerPool};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ServerPool>,
    pub policy: Arc<RetryPolicy>,
    pub max_body_bytes: usize,
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Validate the configuration, then create a server and its backend pool.
    pub fn new(config: BalancerConfig) -> Result<Self, ServerError> {
        let config = finalize(config)?;
        let pool = Arc::new(ServerPool::from_config(&config)?);
        Ok(Self::with_pool(config, pool))
    }

    /// Create a server around an existing pool.
    pub fn with_pool(config: BalancerConfig, pool: Arc<ServerPool>) -> Self {
        let state = AppState {
            pool: pool.clone(),
            policy: Arc::new(RetryPolicy::from_config(&config.retries)),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BalancerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(balance_handler))
            .route("/", any(balance_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let prober = HealthProber::new(self.pool.clone(), &self.config.health_check);
            tokio::spawn(prober.run(shutdown.resubscribe()));
        } else {
            tracing::info!("Health probing disabled");
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> Arc<ServerPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}

/// Dispatch entrypoint: select a live backend, forward, retry and fail over.
async fn balance_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        "Balancing request"
    );

    // Buffered so the same body can be replayed on retry and failover.
    let (head, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting request body");
            metrics::record_request(&method, 413, "none", start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let head = &head;
    let outcome = state
        .policy
        .dispatch(&state.pool, move |backend| {
            let body = body.clone();
            async move { backend.forward(head, body, peer).await }
        })
        .instrument(tracing::info_span!("dispatch", request_id = %request_id))
        .await;

    match outcome {
        Ok(dispatched) => {
            let backend = dispatched.backend.to_string();
            let response = dispatched.value;
            tracing::debug!(
                request_id = %request_id,
                backend = %backend,
                status = %response.status(),
                retries = dispatched.state.retries,
                attempts = dispatched.state.attempts,
                "Upstream responded"
            );
            metrics::record_request(&method, response.status().as_u16(), &backend, start);
            response
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "No backend could serve request");
            metrics::record_request(&method, 503, "none", start);
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
        }
    }
}
