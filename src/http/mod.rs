//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout layers)
//!     → buffer request body
//!     → resilience::retries (select backend, retry, fail over)
//!     → proxy.rs (rewrite and forward to the chosen upstream)
//!     → stream upstream response to the client, or 503
//! ```

pub mod proxy;
pub mod request;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
