//! Network layer helpers.
//!
//! The admin listener is plain TCP by default; `tls.rs` loads certificates
//! when `[listener.tls]` is configured.

pub mod tls;
