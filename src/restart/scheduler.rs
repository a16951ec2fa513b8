//! Periodic restart scheduler.
//!
//! # Responsibilities
//! - Consume the restart flag once per interval
//! - Ask the engine for a non-forced restart when it was set
//! - Run manual (forced) restarts through the same serialization lock
//!
//! # Design Decisions
//! - Restarts never overlap: a tick waits for an in-flight restart and only
//!   then consumes the flag, so it acts only on mutations that landed since
//! - A failed restart is logged, never retried, and never re-arms the flag
//! - Missed ticks are delayed rather than fired in a burst

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::engine::{EngineController, EngineError};
use crate::observability::metrics;
use crate::restart::RestartFlag;

/// What a single scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The flag was clear; nothing to do.
    Idle,
    /// The flag was set and the engine restarted.
    Restarted,
    /// The flag was set but the restart failed.
    Failed,
}

/// Coalesces restart requests into at most one engine restart per interval.
pub struct RestartScheduler {
    flag: Arc<RestartFlag>,
    engine: Arc<dyn EngineController>,
    interval: Duration,
    in_flight: Mutex<()>,
}

impl RestartScheduler {
    pub fn new(
        flag: Arc<RestartFlag>,
        engine: Arc<dyn EngineController>,
        interval: Duration,
    ) -> Self {
        Self {
            flag,
            engine,
            interval,
            in_flight: Mutex::new(()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one scheduling step.
    pub async fn tick(&self) -> TickOutcome {
        let _guard = self.in_flight.lock().await;

        if !self.flag.consume_if_dirty() {
            return TickOutcome::Idle;
        }

        let start = Instant::now();
        match self.engine.restart(false).await {
            Ok(()) => {
                metrics::record_restart("scheduled", true, start);
                tracing::info!(elapsed = ?start.elapsed(), "Engine restarted after config change");
                TickOutcome::Restarted
            }
            Err(e) => {
                metrics::record_restart("scheduled", false, start);
                tracing::error!(error = %e, "Engine restart failed");
                TickOutcome::Failed
            }
        }
    }

    /// Restart immediately on behalf of an administrator.
    ///
    /// Waits for any in-flight restart. Does not touch the flag: mutations
    /// pending at this point still get their scheduled restart.
    pub async fn restart_now(&self, force: bool) -> Result<(), EngineError> {
        let _guard = self.in_flight.lock().await;

        let start = Instant::now();
        let result = self.engine.restart(force).await;
        metrics::record_restart("manual", result.is_ok(), start);
        match &result {
            Ok(()) => tracing::info!(force, "Engine restarted manually"),
            Err(e) => tracing::error!(force, error = %e, "Manual engine restart failed"),
        }
        result
    }

    /// Tick every interval until shutdown is signalled.
    ///
    /// A restart still owed at shutdown is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Restart scheduler starting");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Restart scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Spawn [`RestartScheduler::run`] onto the runtime.
    pub fn spawn(self: Arc<Self>, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
