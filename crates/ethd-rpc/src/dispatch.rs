// crates/ethd-rpc/src/dispatch.rs
//
// Dispatch of inbound legacy calls and the `{id, result, error}` envelope.
//
// An inbound body is `{id, method, params}`. The method is resolved through
// the registry, its arity checked against the entry, and the handler run.
// Every outcome, including malformed input, becomes a well-formed envelope.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ethd_core::error::EthdError;

use crate::handlers::Params;
use crate::proxy::EthereumProxy;
use crate::registry;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Inbound request envelope. `method` and `params` are optional here so a
/// missing field can be answered with an error envelope instead of a
/// deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: Option<String>,
    pub params: Option<Vec<Value>>,
}

/// `error` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

impl From<&EthdError> for RpcErrorBody {
    fn from(e: &EthdError) -> Self {
        Self {
            code: e.code(),
            message: e.message(),
        }
    }
}

/// Outbound envelope: exactly one of `result`/`error` is non-null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Value,
    pub result: Value,
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    pub fn failure(id: Value, error: &EthdError) -> Self {
        Self {
            id,
            result: Value::Null,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes legacy calls to the registered translators of one proxy.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    proxy: Arc<EthereumProxy>,
}

impl Dispatcher {
    pub fn new(proxy: Arc<EthereumProxy>) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> &Arc<EthereumProxy> {
        &self.proxy
    }

    /// Run `method` with positional `params`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, EthdError> {
        let spec = registry::lookup(method)
            .ok_or_else(|| EthdError::MethodNotFound(method.to_string()))?;

        if params.len() > spec.max_params {
            return Err(EthdError::InvalidParameter(format!(
                "{}() takes at most {} arguments ({} given)",
                spec.name,
                spec.max_params,
                params.len()
            )));
        }
        if params.len() < spec.min_params {
            return Err(EthdError::InvalidParameter(format!(
                "{}() takes at least {} arguments ({} given)",
                spec.name,
                spec.min_params,
                params.len()
            )));
        }

        (spec.handler)(&self.proxy, Params::new(spec.name, params)).await
    }

    /// Answer one decoded request envelope.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { id, method, params } = request;
        let (Some(method), Some(params)) = (method, params) else {
            return RpcResponse::failure(id, &EthdError::InvalidRequest);
        };

        tracing::debug!("RPC {} ({} params)", method, params.len());
        match self.call(&method, params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(e) => {
                match &e {
                    EthdError::Transport(_) | EthdError::ChainNotSynced => {
                        tracing::warn!("RPC {} failed: {}", method, e)
                    }
                    _ => tracing::debug!("RPC {} failed: {}", method, e),
                }
                RpcResponse::failure(id, &e)
            }
        }
    }

    /// Answer a raw request body. Bodies that are not a JSON request object
    /// get the invalid-request envelope.
    pub async fn handle_body(&self, body: &[u8]) -> RpcResponse {
        match serde_json::from_slice::<RpcRequest>(body) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::debug!("Rejected request body: {}", e);
                let id = serde_json::from_slice::<Value>(body)
                    .ok()
                    .and_then(|v| v.get("id").cloned())
                    .unwrap_or(Value::Null);
                RpcResponse::failure(id, &EthdError::InvalidRequest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use ethd_core::memory::InMemoryNode;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(EthereumProxy::new(Arc::new(InMemoryNode::new()))))
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = dispatcher()
            .handle_body(br#"{"id": "1", "method": "getfoo", "params": []}"#)
            .await;
        assert_eq!(response.id, json!("1"));
        assert!(response.result.is_null());
        assert_eq!(
            response.error,
            Some(RpcErrorBody {
                code: -32601,
                message: "Method not found".into()
            })
        );
    }

    #[tokio::test]
    async fn test_missing_params_is_invalid_request() {
        let response = dispatcher()
            .handle_body(br#"{"id": "x", "method": "getblockcount"}"#)
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Invalid rpc 2.0 structure");
        assert_eq!(response.id, json!("x"));
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid_request() {
        let response = dispatcher().handle_body(b"not json").await;
        assert_eq!(response.error.unwrap().code, -32602);

        let response = dispatcher()
            .handle_body(br#"{"id": 3, "method": "help", "params": "oops"}"#)
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
        assert_eq!(response.id, json!(3));
    }

    #[tokio::test]
    async fn test_arity_errors_are_generic() {
        let d = dispatcher();
        let err = d.call("getblockcount", vec![json!(1)]).await.unwrap_err();
        assert_eq!(err.code(), -1);
        assert!(err.message().contains("getblockcount"));

        let err = d.call("getblock", vec![]).await.unwrap_err();
        assert_eq!(err.code(), -1);
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = dispatcher()
            .handle(RpcRequest {
                id: json!("cli"),
                method: Some("help".into()),
                params: Some(vec![json!("settxfee")]),
            })
            .await;
        assert!(response.error.is_none());
        assert!(response.result.as_str().unwrap().starts_with("settxfee amount"));
    }
}
