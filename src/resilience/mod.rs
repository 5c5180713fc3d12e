//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → retries.rs (forward, retry same backend with backoff)
//!     → backoff.rs (delay between same-backend retries)
//!     → retry budget spent: demote backend, fail over through the pool
//!     → attempt ceiling reached: terminal 503
//! ```
//!
//! # Design Decisions
//! - Every transport error is treated the same (refused, reset, timeout)
//! - Failure demotes a backend immediately, without waiting for the prober
//! - Retry and attempt ceilings are hard upper bounds for every request

pub mod backoff;
pub mod retries;

pub use retries::{DispatchError, Dispatched, RetryPolicy, RetryState};
