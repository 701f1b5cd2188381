// crates/ethd-core/src/http.rs
//
// JSON-RPC over HTTP(S) to the node, using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EthdError, TransportError};
use crate::transport::{into_result, NodeRequest, NodeTransport, RequestIds};

/// HTTP client for a node's JSON-RPC endpoint (e.g. geth `--http`).
#[derive(Debug)]
pub struct HttpTransport {
    /// Full endpoint URL, e.g. "http://127.0.0.1:8545".
    url: String,
    timeout: Duration,
    client: reqwest::Client,
    ids: RequestIds,
}

impl HttpTransport {
    /// Create a client for `host:port`, over https when `tls` is set.
    pub fn new(host: &str, port: u16, tls: bool, timeout: Duration) -> Result<Self, EthdError> {
        let scheme = if tls { "https" } else { "http" };
        Self::with_url(&format!("{}://{}:{}", scheme, host, port), timeout)
    }

    /// Create a client for an explicit endpoint URL.
    pub fn with_url(url: &str, timeout: Duration) -> Result<Self, EthdError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Io(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            timeout,
            client,
            ids: RequestIds::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if e.is_connect() {
            TransportError::ConnectionRefused
        } else if e.is_decode() {
            TransportError::Malformed(e.to_string())
        } else {
            TransportError::Io(e.to_string())
        }
    }
}

#[async_trait]
impl NodeTransport for HttpTransport {
    async fn call_with_id(
        &self,
        method: &str,
        params: Vec<Value>,
        id: Option<u64>,
    ) -> Result<Value, EthdError> {
        let request = NodeRequest::new(method, params, self.ids.resolve(id));
        tracing::trace!("-> {} {} (id {})", self.url, method, request.id);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        if body.is_empty() {
            return Err(TransportError::NoData.into());
        }

        let parsed: Value = serde_json::from_slice(&body).map_err(|e| {
            TransportError::Malformed(format!("HTTP {} with undecodable body: {}", status, e))
        })?;

        into_result(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Start a one-shot mock node that answers with a fixed body.
    async fn mock_node(response_body: &str) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{}", addr);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            response_body.len(),
            response_body
        );

        let handle = tokio::spawn(async move {
            let mut received = Vec::new();
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                if let Ok(n) = stream.read(&mut buf).await {
                    received.extend_from_slice(&buf[..n]);
                }
                let _ = stream.write_all(response.as_bytes()).await;
            }
            received
        });

        (url, handle)
    }

    #[tokio::test]
    async fn call_returns_result() {
        let (url, handle) = mock_node(r#"{"jsonrpc":"2.0","id":1,"result":"0x63a"}"#).await;
        let transport = HttpTransport::with_url(&url, Duration::from_secs(5)).unwrap();
        let result = transport.call("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(result, Value::String("0x63a".into()));

        let request = String::from_utf8_lossy(&handle.await.unwrap()).to_string();
        assert!(request.contains("\"method\":\"eth_blockNumber\""));
        assert!(request.contains("\"jsonrpc\":\"2.0\""));
    }

    #[tokio::test]
    async fn node_error_is_bad_response() {
        let (url, _handle) = mock_node(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"filter not found"}}"#,
        )
        .await;
        let transport = HttpTransport::with_url(&url, Duration::from_secs(5)).unwrap();
        let err = transport
            .call("eth_getFilterChanges", vec![Value::String("0x1".into())])
            .await
            .unwrap_err();
        assert_eq!(err, EthdError::bad_response(-32000, "filter not found"));
    }

    #[tokio::test]
    async fn connection_error_is_transport_error() {
        let transport =
            HttpTransport::with_url("http://127.0.0.1:1", Duration::from_secs(5)).unwrap(); // Nothing listening
        let result = transport.call("eth_accounts", vec![]).await;
        match result.unwrap_err() {
            EthdError::Transport(_) => {}
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    #[test]
    fn tls_selects_https() {
        let transport = HttpTransport::new("node.local", 8545, true, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url(), "https://node.local:8545");
    }
}
