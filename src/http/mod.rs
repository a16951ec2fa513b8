//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → admin router (auth, handlers)
//!     → request.rs (JSON or form body)
//!     → response.rs (uniform envelope)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{JsonOrForm, PayloadRejection, X_REQUEST_ID};
pub use response::{Envelope, Operation};
pub use server::{AppState, HttpServer};
