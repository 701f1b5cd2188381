// crates/ethd-core/src/transport.rs
//
// The seam between the proxy and the Ethereum node: a single JSON-RPC 2.0
// request/response exchange, independent of how the bytes travel.
//
// Implemented by `HttpTransport`, `IpcTransport` and the in-memory node.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EthdError, TransportError};

/// One exchange with the node's native JSON-RPC interface.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// Call `method` with positional `params`. When `id` is `None` the
    /// transport assigns the next id from its own counter.
    async fn call_with_id(
        &self,
        method: &str,
        params: Vec<Value>,
        id: Option<u64>,
    ) -> Result<Value, EthdError>;

    /// Call `method` with an automatically assigned request id.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, EthdError> {
        self.call_with_id(method, params, None).await
    }
}

/// Outbound JSON-RPC 2.0 envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl NodeRequest {
    pub fn new(method: &str, params: Vec<Value>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

/// Monotonic request-id source. Starts at 1 and never hands out the same
/// value twice within a process.
#[derive(Debug)]
pub struct RequestIds {
    next: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Use `explicit` if the caller supplied one, otherwise draw the next id.
    pub fn resolve(&self, explicit: Option<u64>) -> u64 {
        match explicit {
            Some(id) => id,
            None => self.next.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the `result` member of a node response, or turn its `error`
/// member into [`EthdError::BadResponse`].
pub fn into_result(response: Value) -> Result<Value, EthdError> {
    let Value::Object(mut body) = response else {
        return Err(TransportError::Malformed(format!(
            "expected a JSON object, got {}",
            response
        ))
        .into());
    };

    if let Some(result) = body.remove("result") {
        return Ok(result);
    }

    match body.remove("error") {
        Some(Value::Object(error)) => {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown node error")
                .to_string();
            Err(EthdError::BadResponse { code, message })
        }
        Some(other) => Err(EthdError::BadResponse {
            code: -1,
            message: other.to_string(),
        }),
        None => Err(TransportError::Malformed("response has neither result nor error".into()).into()),
    }
}
