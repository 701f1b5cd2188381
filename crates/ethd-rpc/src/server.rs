// crates/ethd-rpc/src/server.rs
//
// HTTP front end: ProxyRpcServer and RpcConfig.
//
// A single JSON endpoint at `/` accepts legacy envelopes and answers with
// `{id, result, error}`. `/_log/` echoes whatever it receives into the log,
// for debugging client integrations.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::dispatch::{Dispatcher, RpcResponse};
use crate::proxy::EthereumProxy;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Listen address of the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9500,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// ProxyRpcServer
// ---------------------------------------------------------------------------

/// The legacy RPC server in front of one [`EthereumProxy`].
#[derive(Debug, Clone)]
pub struct ProxyRpcServer {
    config: RpcConfig,
    dispatcher: Arc<Dispatcher>,
}

impl ProxyRpcServer {
    pub fn new(config: RpcConfig, proxy: Arc<EthereumProxy>) -> Self {
        Self {
            config,
            dispatcher: Arc::new(Dispatcher::new(proxy)),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_rpc))
            .route("/_log/", get(handle_log).post(handle_log))
            .with_state(self.dispatcher.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let raw = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = raw.parse().map_err(|_| ServerError::InvalidAddress(raw))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Legacy RPC server listening on http://{}", addr);
        }
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("Legacy RPC server stopped");
        Ok(())
    }
}

async fn handle_rpc(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Json<RpcResponse> {
    Json(dispatcher.handle_body(&body).await)
}

async fn handle_log(RawQuery(query): RawQuery, body: Bytes) -> Json<Value> {
    tracing::warn!(
        "\nRequest args: {};\nRequest body: {}",
        query.unwrap_or_default(),
        String::from_utf8_lossy(&body)
    );
    Json(json!({"status": "OK"}))
}
