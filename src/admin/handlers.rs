use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admin::auth::Caller;
use crate::engine::EngineStatus;
use crate::http::request::{JsonOrForm, PayloadRejection};
use crate::http::response::{Envelope, Operation};
use crate::http::server::AppState;
use crate::inbound::{InboundPatch, InboundSettings, MutationError, ValidationError};
use crate::observability::metrics;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub engine: EngineStatus,
}

/// Body of a batch add.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub inbounds: Vec<InboundSettings>,
}

fn malformed(reason: String) -> MutationError {
    ValidationError::Malformed(reason).into()
}

fn finish<T: Serialize>(op: Operation, result: Result<T, MutationError>) -> Envelope {
    metrics::record_mutation(op.label(), result.is_ok());
    if let Err(e) = &result {
        tracing::warn!(op = op.label(), error = %e, "Inbound mutation rejected");
    }
    Envelope::from_result(op, result)
}

/// Run a gateway call on the blocking pool; store writes hit the disk.
async fn offload<T, F>(op: Operation, call: F) -> Result<T, Envelope>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call).await.map_err(|e| {
        tracing::error!(op = op.label(), error = %e, "Inbound operation task failed");
        metrics::record_mutation(op.label(), false);
        Envelope::err(op, e)
    })
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        engine: state.engine.status(),
    })
}

pub async fn list_inbounds(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Envelope {
    let gateway = state.gateway;
    match offload(Operation::List, move || gateway.list(caller.owner)).await {
        Ok(result) => Envelope::from_result(Operation::List, result),
        Err(envelope) => envelope,
    }
}

pub async fn add_inbound(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<JsonOrForm<InboundSettings>, PayloadRejection>,
) -> Envelope {
    let JsonOrForm(settings) = match payload {
        Ok(payload) => payload,
        Err(PayloadRejection(reason)) => {
            return finish::<()>(Operation::Add, Err(malformed(reason)))
        }
    };
    let gateway = state.gateway;
    match offload(Operation::Add, move || gateway.add(caller.owner, settings)).await {
        Ok(result) => finish(Operation::Add, result.map(|id| json!({ "id": id }))),
        Err(envelope) => envelope,
    }
}

pub async fn add_batch_inbounds(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            return finish::<()>(Operation::AddBatch, Err(malformed(e.body_text())))
        }
    };
    let gateway = state.gateway;
    let batch = move || gateway.add_batch(caller.owner, req.inbounds);
    match offload(Operation::AddBatch, batch).await {
        Ok(result) => finish(Operation::AddBatch, result),
        Err(envelope) => envelope,
    }
}

pub async fn delete_inbound(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Envelope {
    let gateway = state.gateway;
    match offload(Operation::Delete, move || gateway.delete(caller.owner, &id)).await {
        Ok(result) => finish(Operation::Delete, result),
        Err(envelope) => envelope,
    }
}

pub async fn update_inbound(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<JsonOrForm<InboundPatch>, PayloadRejection>,
) -> Envelope {
    let JsonOrForm(patch) = match payload {
        Ok(payload) => payload,
        Err(PayloadRejection(reason)) => {
            return finish::<()>(Operation::Update, Err(malformed(reason)))
        }
    };
    let gateway = state.gateway;
    match offload(Operation::Update, move || gateway.update(caller.owner, &id, patch)).await {
        Ok(result) => finish(Operation::Update, result),
        Err(envelope) => envelope,
    }
}

pub async fn restart_engine(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Envelope {
    tracing::info!(owner = caller.owner, "Manual engine restart requested");
    Envelope::from_result(Operation::RestartEngine, state.scheduler.restart_now(true).await)
}
