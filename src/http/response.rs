//! Uniform response envelope for admin operations.
//!
//! Every admin call answers `{"success", "msg", "obj"}`. Business failures
//! (validation, store) are reported in the envelope with HTTP 200 so clients
//! have one shape to handle.

use std::fmt::Display;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Admin operations, labelled for the envelope message and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Add,
    AddBatch,
    Delete,
    Update,
    RestartEngine,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Add => "add",
            Operation::AddBatch => "add batch",
            Operation::Delete => "delete",
            Operation::Update => "update",
            Operation::RestartEngine => "restart engine",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub msg: String,
    pub obj: Option<Value>,
}

impl Envelope {
    pub fn ok(op: Operation, obj: Option<Value>) -> Self {
        Self {
            success: true,
            msg: format!("{} succeeded", op.label()),
            obj,
        }
    }

    pub fn err(op: Operation, error: impl Display) -> Self {
        Self {
            success: false,
            msg: format!("{} failed: {}", op.label(), error),
            obj: None,
        }
    }

    /// Wrap an operation result, serializing the success payload into `obj`.
    pub fn from_result<T, E>(op: Operation, result: Result<T, E>) -> Self
    where
        T: Serialize,
        E: Display,
    {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(Value::Null) => Self::ok(op, None),
                Ok(obj) => Self::ok(op, Some(obj)),
                Err(e) => Self::err(op, e),
            },
            Err(e) => Self::err(op, e),
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_without_payload() {
        let envelope = Envelope::from_result::<(), String>(Operation::Delete, Ok(()));
        assert!(envelope.success);
        assert_eq!(envelope.msg, "delete succeeded");
        assert!(envelope.obj.is_none());
    }

    #[test]
    fn test_failure_carries_label_and_error() {
        let envelope = Envelope::from_result::<(), _>(
            Operation::AddBatch,
            Err("inbound list must not be empty"),
        );
        assert!(!envelope.success);
        assert_eq!(envelope.msg, "add batch failed: inbound list must not be empty");
    }

    #[test]
    fn test_payload_is_serialized() {
        let envelope =
            Envelope::from_result::<_, String>(Operation::Add, Ok(serde_json::json!({ "id": 3 })));
        assert_eq!(envelope.obj, Some(serde_json::json!({ "id": 3 })));
    }
}
