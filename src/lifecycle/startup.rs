//! Startup orchestration.
//!
//! # Responsibilities
//! - Build store, engine, flag, gateway and scheduler from config
//! - Start background tasks (scheduler, config reload, metrics)
//! - Bind the admin listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast on store, bind and TLS errors
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use crate::admin::AdminDirectory;
use crate::config::watcher::ConfigWatcher;
use crate::config::PanelConfig;
use crate::engine::{EngineController, ProcessEngine};
use crate::http::{AppState, HttpServer};
use crate::inbound::{ConfigStore, MemoryStore, MutationGateway, StoreError};
use crate::lifecycle::signals::spawn_signal_handler;
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;
use crate::restart::{RestartFlag, RestartScheduler};

/// Fatal errors while bringing the panel up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open inbound store: {0}")]
    Store(#[from] StoreError),

    #[error("invalid address {0:?}")]
    Address(String),

    #[error("failed to bind listener: {0}")]
    Bind(std::io::Error),

    #[error("failed to load TLS configuration: {0}")]
    Tls(std::io::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Wire up the shared components described by `config`.
pub fn build_state(config: &PanelConfig) -> Result<AppState, StartupError> {
    let store: Arc<dyn ConfigStore> = match &config.store.path {
        Some(path) => Arc::new(MemoryStore::open(Path::new(path))?),
        None => {
            tracing::warn!("No store path configured, inbounds will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let flag = Arc::new(RestartFlag::new());
    let engine: Arc<dyn EngineController> =
        Arc::new(ProcessEngine::new(config.engine.clone(), store.clone()));
    let scheduler = Arc::new(RestartScheduler::new(
        flag.clone(),
        engine.clone(),
        Duration::from_secs(config.scheduler.restart_interval_secs),
    ));

    if config.admin.users.is_empty() {
        tracing::warn!("No admin users configured, every admin request will be rejected");
    }

    Ok(AppState {
        gateway: MutationGateway::new(store, flag),
        scheduler,
        engine,
        admins: Arc::new(ArcSwap::from_pointee(AdminDirectory::from_users(
            &config.admin.users,
        ))),
    })
}

/// Swap in the admin directory of every reloaded config.
fn spawn_admin_reload(
    admins: Arc<ArcSwap<AdminDirectory>>,
    mut updates: mpsc::UnboundedReceiver<PanelConfig>,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else { break };
                    let directory = AdminDirectory::from_users(&config.admin.users);
                    tracing::info!(users = directory.len(), "Admin users reloaded");
                    admins.store(Arc::new(directory));
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Run the panel until a termination signal arrives.
pub async fn run(config: PanelConfig, config_path: Option<&Path>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let state = build_state(&config)?;
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    // Bring the engine in line with the stored inbounds before taking traffic.
    if let Err(e) = state.scheduler.restart_now(true).await {
        tracing::error!(error = %e, "Initial engine start failed, continuing");
    }
    let scheduler_task = state.scheduler.clone().spawn(shutdown.subscribe());

    let _watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            spawn_admin_reload(state.admins.clone(), updates, shutdown.subscribe());
            match watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let addr: SocketAddr = config
        .listener
        .bind_address
        .parse()
        .map_err(|_| StartupError::Address(config.listener.bind_address.clone()))?;
    let server = HttpServer::new(&config, state.clone());

    let served = match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await.map_err(StartupError::Tls)?;
            server.run_tls(addr, tls, shutdown.subscribe()).await
        }
        None => {
            let listener = TcpListener::bind(addr).await.map_err(StartupError::Bind)?;
            server.run(listener, shutdown.subscribe()).await
        }
    };

    shutdown.trigger();
    let _ = scheduler_task.await;
    if let Err(e) = state.engine.stop().await {
        tracing::error!(error = %e, "Failed to stop engine");
    }

    served.map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminUser;
    use crate::inbound::InboundSettings;

    #[test]
    fn test_build_state_wires_components() {
        let mut config = PanelConfig::default();
        config.admin.users.push(AdminUser { owner_id: 4, api_key: "k".into() });

        let state = build_state(&config).unwrap();
        assert_eq!(state.admins.load().owner_for("k"), Some(4));
        assert_eq!(state.scheduler.interval(), Duration::from_secs(10));

        let id = state
            .gateway
            .add(4, InboundSettings { port: 8080, ..Default::default() })
            .unwrap();
        assert_eq!(state.gateway.list(4).unwrap()[0].id, id);
    }

    #[tokio::test]
    async fn test_admin_reload_swaps_directory() {
        let admins = Arc::new(ArcSwap::from_pointee(AdminDirectory::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let task = spawn_admin_reload(admins.clone(), rx, shutdown.subscribe());

        let mut config = PanelConfig::default();
        config.admin.users.push(AdminUser { owner_id: 9, api_key: "fresh".into() });
        tx.send(config).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(admins.load().owner_for("fresh"), Some(9));
    }

    #[tokio::test]
    async fn test_config_file_rewrite_swaps_admin_keys() {
        let dir = std::env::temp_dir().join(format!("panel-reload-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("panel.toml");
        let users = |owner: i64, key: &str| {
            format!("[[admin.users]]\nowner_id = {}\napi_key = \"{}\"\n", owner, key)
        };
        std::fs::write(&path, users(1, "old-key")).unwrap();

        let admins = Arc::new(ArcSwap::from_pointee(AdminDirectory::from_users(
            &crate::config::load_config(&path).unwrap().admin.users,
        )));
        let shutdown = Shutdown::new();
        let (watcher, updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.with_debounce(Duration::from_millis(50)).run().unwrap();
        spawn_admin_reload(admins.clone(), updates, shutdown.subscribe());
        tokio::time::sleep(Duration::from_millis(100)).await;

        std::fs::write(&path, "[admin\nbroken").unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(admins.load().owner_for("old-key"), Some(1));

        std::fs::write(&path, users(3, "new-key")).unwrap();
        let mut swapped = false;
        for _ in 0..50 {
            if admins.load().owner_for("new-key") == Some(3) {
                swapped = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(swapped, "admin directory was not reloaded");
        assert_eq!(admins.load().owner_for("old-key"), None);

        shutdown.trigger();
        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }
}
