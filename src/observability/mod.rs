//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → optional Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to the dispatch span of every request
//! - Metric updates are no-ops until a recorder is installed
//! - Nothing is persisted; the scrape endpoint only exposes in-process state

pub mod logging;
pub mod metrics;
