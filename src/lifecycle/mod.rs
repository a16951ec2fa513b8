//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Store → Engine → Scheduler → initial engine start → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop scheduler → Stop engine
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Engine start failure at boot is logged, not fatal
//! - A restart still owed at shutdown is dropped

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_state, run, StartupError};
