//! Administrative API.
//!
//! Every route requires `Authorization: Bearer <api_key>`; the key decides
//! which owner the caller acts as.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub use auth::{AdminDirectory, Caller};

pub fn setup_admin_router(state: AppState) -> Router {
    let inbounds = Router::new()
        .route("/list", post(list_inbounds))
        .route("/add", post(add_inbound))
        .route("/addBatch", post(add_batch_inbounds))
        .route("/del/{id}", post(delete_inbound))
        .route("/update/{id}", post(update_inbound));

    Router::new()
        .nest("/panel/inbound", inbounds)
        .route("/panel/engine/restart", post(restart_engine))
        .route("/panel/status", get(get_status))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
