//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway, scheduler, engine
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
