//! Proxy engine control.
//!
//! # Data Flow
//! ```text
//! restart(force)
//!     → render.rs (enabled inbounds → engine config JSON)
//!     → process.rs (skip if unchanged, else write file, kill, respawn)
//! ```
//!
//! # Design Decisions
//! - The engine config format is opaque to the rest of the panel
//! - A non-forced restart may be skipped when nothing changed
//! - Callers serialize restarts; the controller does not queue them

pub mod process;
pub mod render;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::inbound::StoreError;

pub use process::ProcessEngine;

/// Errors raised while restarting the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read inbounds: {0}")]
    Store(#[from] StoreError),

    #[error("failed to render engine config: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to write engine config: {0}")]
    WriteConfig(std::io::Error),

    #[error("failed to spawn engine: {0}")]
    Spawn(std::io::Error),

    #[error("failed to stop engine: {0}")]
    Stop(std::io::Error),

    #[error("engine exited during startup: {0}")]
    ExitedEarly(String),
}

/// Point-in-time view of the engine for the status endpoint.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub running: bool,
    pub restarts: u64,
    pub last_error: Option<String>,
}

/// Start/stop/restart of the external proxy engine.
#[async_trait]
pub trait EngineController: Send + Sync {
    /// Reload the engine with the current store contents.
    ///
    /// Returns once the engine is confirmed running or has failed. When
    /// `force` is false the controller may skip a restart that would not
    /// change anything.
    async fn restart(&self, force: bool) -> Result<(), EngineError>;

    /// Stop the engine if it is running.
    async fn stop(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn status(&self) -> EngineStatus {
        EngineStatus::default()
    }
}
