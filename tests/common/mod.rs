//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use inbound_panel::admin::AdminDirectory;
use inbound_panel::config::{AdminUser, PanelConfig};
use inbound_panel::engine::{EngineController, EngineError};
use inbound_panel::http::{AppState, HttpServer};
use inbound_panel::inbound::{MemoryStore, MutationGateway};
use inbound_panel::restart::{RestartFlag, RestartScheduler};

pub const OWNER_1_KEY: &str = "key-owner-1";
pub const OWNER_2_KEY: &str = "key-owner-2";

/// Engine double that counts restart calls.
#[derive(Default)]
pub struct FakeEngine {
    pub restarts: AtomicUsize,
    pub forced: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeEngine {
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineController for FakeEngine {
    async fn restart(&self, force: bool) -> Result<(), EngineError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        if force {
            self.forced.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::ExitedEarly("exit status: 23".into()));
        }
        Ok(())
    }
}

/// A fully wired panel with in-memory store and fake engine.
#[allow(dead_code)]
pub struct TestPanel {
    pub router: Router,
    pub gateway: MutationGateway,
    pub store: Arc<MemoryStore>,
    pub flag: Arc<RestartFlag>,
    pub scheduler: Arc<RestartScheduler>,
    pub engine: Arc<FakeEngine>,
}

pub fn panel() -> TestPanel {
    let store = Arc::new(MemoryStore::new());
    let flag = Arc::new(RestartFlag::new());
    let engine = Arc::new(FakeEngine::default());
    let scheduler = Arc::new(RestartScheduler::new(
        flag.clone(),
        engine.clone(),
        Duration::from_secs(10),
    ));
    let gateway = MutationGateway::new(store.clone(), flag.clone());

    let mut config = PanelConfig::default();
    config.admin.users = vec![
        AdminUser { owner_id: 1, api_key: OWNER_1_KEY.into() },
        AdminUser { owner_id: 2, api_key: OWNER_2_KEY.into() },
    ];

    let state = AppState {
        gateway: gateway.clone(),
        scheduler: scheduler.clone(),
        engine: engine.clone(),
        admins: Arc::new(ArcSwap::from_pointee(AdminDirectory::from_users(
            &config.admin.users,
        ))),
    };

    TestPanel {
        router: HttpServer::build_router(&config, state),
        gateway,
        store,
        flag,
        scheduler,
        engine,
    }
}

/// Send a request through the router, returning status, headers and JSON body
/// (`Value::Null` when the body is not JSON).
#[allow(dead_code)]
pub async fn send(
    router: &Router,
    path: &str,
    key: Option<&str>,
    content_type: &str,
    body: String,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    let request = builder.body(Body::from(body)).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, json)
}

#[allow(dead_code)]
pub async fn post_json(router: &Router, path: &str, key: &str, body: Value) -> Value {
    let (status, _, json) = send(
        router,
        path,
        Some(key),
        "application/json",
        body.to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected status for {}", path);
    json
}

#[allow(dead_code)]
pub async fn post_form(router: &Router, path: &str, key: &str, body: &str) -> Value {
    let (status, _, json) = send(
        router,
        path,
        Some(key),
        "application/x-www-form-urlencoded",
        body.to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected status for {}", path);
    json
}

/// `n` distinct inbound bodies starting at `first_port`.
#[allow(dead_code)]
pub fn inbound_bodies(n: u16, first_port: u16) -> Vec<Value> {
    (0..n)
        .map(|i| {
            serde_json::json!({
                "port": first_port + i,
                "protocol": "vless",
                "remark": format!("node-{}", i),
            })
        })
        .collect()
}
