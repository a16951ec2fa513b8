//! Inbound panel library.
//!
//! Manages proxy inbound records and keeps an external proxy engine in sync
//! with them, coalescing bursts of changes into at most one engine restart
//! per scheduler interval.

pub mod admin;
pub mod config;
pub mod engine;
pub mod http;
pub mod inbound;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod restart;

pub use config::schema::PanelConfig;
pub use http::HttpServer;
pub use inbound::MutationGateway;
pub use lifecycle::Shutdown;
pub use restart::{RestartFlag, RestartScheduler};
