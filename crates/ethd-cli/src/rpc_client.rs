// crates/ethd-cli/src/rpc_client.rs
//
// Lightweight client that POSTs one legacy envelope to ethereumd.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use ethd_rpc::RpcResponse;

/// Request id every CLI call carries.
pub const CLI_REQUEST_ID: &str = "ethereum-cli";

/// Mirrors the server's request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRequest {
    pub id: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl LegacyRequest {
    pub fn new(method: &str, params: Vec<Value>) -> Self {
        Self {
            id: CLI_REQUEST_ID.to_string(),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("couldn't connect to server: unknown (code -1)")]
    Connect,

    #[error("server request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where ethereumd listens, read from the `ethpconnect`/`ethpport` keys of
/// its config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProxyEndpoint {
    #[serde(default = "default_ethpconnect")]
    pub ethpconnect: String,
    #[serde(default = "default_ethpport")]
    pub ethpport: u16,
}

fn default_ethpconnect() -> String {
    "127.0.0.1".to_string()
}

fn default_ethpport() -> u16 {
    9500
}

impl Default for ProxyEndpoint {
    fn default() -> Self {
        Self {
            ethpconnect: default_ethpconnect(),
            ethpport: default_ethpport(),
        }
    }
}

impl ProxyEndpoint {
    /// Read the endpoint from a config file. Unknown keys are ignored.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.ethpconnect, self.ethpport)
    }
}

/// Interpret a command-line argument: JSON when it parses, a string otherwise.
pub fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Send one call to ethereumd and return its response envelope.
pub async fn rpc_call(
    endpoint: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<RpcResponse, ClientError> {
    let request = LegacyRequest::new(method, params);

    let client = reqwest::Client::new();
    let resp = client
        .post(endpoint)
        .json(&request)
        .send()
        .await
        .map_err(|e| if e.is_connect() { ClientError::Connect } else { ClientError::Http(e) })?;

    let rpc_response: RpcResponse = resp.json().await?;
    Ok(rpc_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("10"), json!(10));
        assert_eq!(parse_param("true"), json!(true));
        assert_eq!(parse_param("0.5"), json!(0.5));
        assert_eq!(parse_param("[1,2]"), json!([1, 2]));
        assert_eq!(parse_param("0xabc"), json!("0xabc"));
        assert_eq!(parse_param("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_endpoint_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ethereum.conf");
        fs::write(&path, "ethpport = 9575\nrpcport = 8545\n").unwrap();

        let endpoint = ProxyEndpoint::load(&path).unwrap();
        assert_eq!(endpoint.url(), "http://127.0.0.1:9575");
        assert_eq!(ProxyEndpoint::default().url(), "http://127.0.0.1:9500");
    }

    #[test]
    fn test_request_envelope() {
        let request = LegacyRequest::new("getblockhash", vec![json!(3)]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": "ethereum-cli", "method": "getblockhash", "params": [3]})
        );
    }

    #[tokio::test]
    async fn test_rpc_call_against_mock_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"{"id":"ethereum-cli","result":12,"error":null}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let response = rpc_call(&format!("http://{}", addr), "getblockcount", vec![])
            .await
            .unwrap();
        assert_eq!(response.result, json!(12));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let err = rpc_call(&format!("http://{}", addr), "getblockcount", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connect));
    }
}
