//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (fixed, ordered backend list)
//!     → round_robin.rs (ring scan from the shared cursor, live backends only)
//!     → backend.rs (liveness flag + bound reverse proxy)
//!     → Return backend or None when nothing is live
//! ```
//!
//! # Design Decisions
//! - The backend list never changes after startup
//! - One reader/writer lock per backend, never a pool-wide lock
//! - The cursor is a single lock-free atomic

use std::sync::Arc;

pub mod backend;
pub mod pool;
pub mod round_robin;

use backend::Backend;

/// Selection strategy over a fixed backend list.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick the next live backend, or `None` if none is live.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
