//! Engine controller backed by a child process.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::engine::render::render_config;
use crate::engine::{EngineController, EngineError, EngineStatus};
use crate::inbound::ConfigStore;

const CONFIG_PLACEHOLDER: &str = "{config}";

#[derive(Default)]
struct ProcessState {
    child: Option<Child>,
    /// Config the current child (or last render-only pass) was started with.
    applied: Option<String>,
}

impl ProcessState {
    /// Polls the child. An exited child is reaped and dropped, so it is never
    /// killed afterwards.
    fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::warn!(%status, "Engine process exited");
                self.child = None;
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to poll engine process");
                false
            }
        }
    }

    /// Kill the child if one is still alive.
    async fn kill(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            if let Some(mut child) = self.child.take() {
                child.kill().await.map_err(EngineError::Stop)?;
            }
        }
        self.child = None;
        Ok(())
    }
}

/// Runs the proxy engine as a child process fed from the inbound store.
///
/// Without a configured binary the controller only renders the config file,
/// which is useful when the engine is supervised elsewhere.
pub struct ProcessEngine {
    config: EngineConfig,
    store: Arc<dyn ConfigStore>,
    state: Mutex<ProcessState>,
    running: AtomicBool,
    restarts: AtomicU64,
    last_error: StdMutex<Option<String>>,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            config,
            store,
            state: Mutex::new(ProcessState::default()),
            running: AtomicBool::new(false),
            restarts: AtomicU64::new(0),
            last_error: StdMutex::new(None),
        }
    }

    fn args(&self) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|a| a.replace(CONFIG_PLACEHOLDER, &self.config.config_path))
            .collect()
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }

    /// Returns whether the engine was (re)started or the config rewritten.
    async fn apply(&self, force: bool) -> Result<bool, EngineError> {
        let inbounds = self.store.list_enabled()?;
        let rendered = render_config(&inbounds)?;

        let mut state = self.state.lock().await;
        let alive = state.is_running();
        self.running.store(alive, Ordering::SeqCst);
        let running = alive || self.config.binary.is_none();
        if !force && running && state.applied.as_deref() == Some(rendered.as_str()) {
            tracing::debug!("Engine config unchanged, skipping restart");
            return Ok(false);
        }

        tokio::fs::write(&self.config.config_path, &rendered)
            .await
            .map_err(EngineError::WriteConfig)?;

        self.running.store(false, Ordering::SeqCst);
        state.kill().await?;

        let Some(binary) = self.config.binary.as_deref() else {
            state.applied = Some(rendered);
            tracing::info!(
                path = %self.config.config_path,
                inbounds = inbounds.len(),
                "Engine config rendered"
            );
            return Ok(true);
        };

        let mut child = Command::new(binary)
            .args(self.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        tokio::time::sleep(Duration::from_millis(self.config.startup_grace_ms)).await;
        if let Some(status) = child.try_wait().map_err(EngineError::Spawn)? {
            return Err(EngineError::ExitedEarly(status.to_string()));
        }

        tracing::info!(
            binary,
            pid = ?child.id(),
            inbounds = inbounds.len(),
            "Engine started"
        );
        state.child = Some(child);
        state.applied = Some(rendered);
        self.running.store(true, Ordering::SeqCst);
        Ok(true)
    }
}

#[async_trait]
impl EngineController for ProcessEngine {
    async fn restart(&self, force: bool) -> Result<(), EngineError> {
        match self.apply(force).await {
            Ok(applied) => {
                if applied {
                    self.restarts.fetch_add(1, Ordering::Relaxed);
                }
                self.set_last_error(None);
                Ok(())
            }
            Err(e) => {
                self.set_last_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn stop(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        if state.is_running() {
            state.kill().await?;
            tracing::info!("Engine stopped");
        }
        state.applied = None;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn status(&self) -> EngineStatus {
        // A restart holding the lock publishes its own result when done.
        if let Ok(mut state) = self.state.try_lock() {
            if self.config.binary.is_some() {
                self.running.store(state.is_running(), Ordering::SeqCst);
            }
        }

        EngineStatus {
            running: self.running.load(Ordering::SeqCst),
            restarts: self.restarts.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::{InboundSettings, MemoryStore, NewInbound};

    fn engine_config(binary: Option<&str>, args: &[&str]) -> EngineConfig {
        EngineConfig {
            binary: binary.map(str::to_string),
            args: args.iter().map(|a| a.to_string()).collect(),
            config_path: std::env::temp_dir()
                .join(format!("engine-{}.json", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            startup_grace_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_render_only_writes_config() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(NewInbound::stamp(1, InboundSettings { port: 443, ..Default::default() }))
            .unwrap();
        let config = engine_config(None, &[]);
        let path = config.config_path.clone();
        let engine = ProcessEngine::new(config, store);

        engine.restart(false).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("inbound-443"));
        assert_eq!(engine.status().restarts, 1);

        engine.restart(false).await.unwrap();
        assert_eq!(engine.status().restarts, 1, "unchanged config is not re-applied");
        engine.restart(true).await.unwrap();
        assert_eq!(engine.status().restarts, 2);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_args_substitute_config_path() {
        let config = engine_config(Some("xray"), &["run", "-c", "{config}"]);
        let path = config.config_path.clone();
        let engine = ProcessEngine::new(config, Arc::new(MemoryStore::new()));
        assert_eq!(engine.args(), vec!["run".to_string(), "-c".to_string(), path]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_is_reported() {
        let config = engine_config(Some("false"), &[]);
        let path = config.config_path.clone();
        let engine = ProcessEngine::new(config, Arc::new(MemoryStore::new()));

        let err = engine.restart(false).await.unwrap_err();
        assert!(matches!(err, EngineError::ExitedEarly(_)));
        let status = engine.status();
        assert!(!status.running);
        assert!(status.last_error.is_some());

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unchanged_config_skips_respawn() {
        let config = engine_config(Some("sleep"), &["30"]);
        let path = config.config_path.clone();
        let engine = ProcessEngine::new(config, Arc::new(MemoryStore::new()));

        engine.restart(false).await.unwrap();
        let first_pid = engine.state.lock().await.child.as_ref().and_then(|c| c.id());
        assert!(engine.status().running);

        engine.restart(false).await.unwrap();
        let second_pid = engine.state.lock().await.child.as_ref().and_then(|c| c.id());
        assert_eq!(first_pid, second_pid);

        engine.restart(true).await.unwrap();
        let forced_pid = engine.state.lock().await.child.as_ref().and_then(|c| c.id());
        assert_ne!(first_pid, forced_pid);

        engine.stop().await.unwrap();
        assert!(!engine.status().running);
        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_after_engine_crash() {
        let config = engine_config(Some("sh"), &["-c", "sleep 0.3"]);
        let path = config.config_path.clone();
        let engine = ProcessEngine::new(config, Arc::new(MemoryStore::new()));

        engine.restart(true).await.unwrap();
        assert!(engine.status().running);

        tokio::time::sleep(Duration::from_millis(500)).await;
        let status = engine.status();
        assert!(!status.running, "exited engine must not be reported as running");
        assert!(engine.state.lock().await.child.is_none());

        engine.restart(false).await.unwrap();
        let pid = engine.state.lock().await.child.as_ref().and_then(|c| c.id());
        assert!(pid.is_some());
        assert_eq!(engine.status().restarts, 2);
        assert!(engine.status().last_error.is_none());

        tokio::time::sleep(Duration::from_millis(500)).await;
        engine.stop().await.unwrap();
        assert!(!engine.status().running);
        std::fs::remove_file(&path).unwrap_or_default();
    }
}
