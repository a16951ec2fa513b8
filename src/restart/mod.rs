//! Restart coalescing subsystem.
//!
//! # Data Flow
//! ```text
//! successful mutation ─→ flag.rs  mark_dirty()
//!                              │
//!          every interval      ▼
//! scheduler.rs ─→ consume_if_dirty() ─→ true ─→ EngineController::restart(false)
//!                                    └→ false ─→ nothing this tick
//! ```
//!
//! # Design Decisions
//! - One flag per process, injected rather than global
//! - Only the scheduler clears the flag
//! - N mutations inside one interval cost exactly one restart

pub mod flag;
pub mod scheduler;

pub use flag::RestartFlag;
pub use scheduler::{RestartScheduler, TickOutcome};
