//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probing (active.rs):
//!     Periodic timer
//!     → TCP connect to every backend, bounded by a timeout
//!     → set_live(true | false) per backend
//!
//! Failure-driven demotion (resilience::retries):
//!     Retry budget spent on a backend
//!     → set_live(false) between prober ticks
//! ```
//!
//! # Design Decisions
//! - A probe is a plain TCP connect; any listening socket counts as live
//! - Probes within a tick run concurrently and never affect each other
//! - A dead backend is only revived by a successful probe

pub mod active;

pub use active::{HealthProber, ProbeSummary};
