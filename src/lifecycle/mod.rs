//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build pool → Bind listener → Spawn prober → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Prober exits, server drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is served
//! - Listener binds last, after the pool is built

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
