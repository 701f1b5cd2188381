// crates/ethd-rpc/tests/http_server.rs
//
// End-to-end tests of the axum front end over a real TCP socket.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use ethd_core::memory::InMemoryNode;
use ethd_core::units::WEI_PER_ETHER;
use ethd_rpc::{EthereumProxy, ProxyRpcServer, RpcConfig};

/// Start a server on an ephemeral port. Dropping the returned sender stops it.
async fn start_server(node: Arc<InMemoryNode>) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let server = ProxyRpcServer::new(RpcConfig::default(), Arc::new(EthereumProxy::new(node)));
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        server
            .serve(listener, async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (url, tx)
}

async fn post(url: &str, body: String) -> Value {
    reqwest::Client::new()
        .post(url)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_envelope_round_trip() {
    let node = Arc::new(InMemoryNode::new());
    node.add_account("0x00000000000000000000000000000000000000a1", 2 * WEI_PER_ETHER);
    let (url, _stop) = start_server(node).await;

    let response = post(
        &url,
        json!({"id": "ethereum-cli", "method": "getbalance", "params": []}).to_string(),
    )
    .await;
    assert_eq!(response, json!({"id": "ethereum-cli", "result": 2.0, "error": null}));
}

#[tokio::test]
async fn test_errors_are_enveloped() {
    let (url, _stop) = start_server(Arc::new(InMemoryNode::new())).await;

    let response = post(
        &url,
        json!({"id": "1", "method": "getblock", "params": ["0xdead"]}).to_string(),
    )
    .await;
    assert_eq!(response["result"], Value::Null);
    assert_eq!(response["error"], json!({"code": -5, "message": "Block not found"}));

    let response = post(&url, json!({"id": "2", "method": "nope", "params": []}).to_string()).await;
    assert_eq!(response["error"]["code"], json!(-32601));

    let response = post(&url, "{{{".to_string()).await;
    assert_eq!(
        response["error"],
        json!({"code": -32602, "message": "Invalid rpc 2.0 structure"})
    );
}

#[tokio::test]
async fn test_log_endpoint() {
    let (url, _stop) = start_server(Arc::new(InMemoryNode::new())).await;
    let client = reqwest::Client::new();

    let response: Value = client
        .get(format!("{}/_log/?a=1", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response, json!({"status": "OK"}));

    let response: Value = client
        .post(format!("{}/_log/", url))
        .body("anything")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response, json!({"status": "OK"}));
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = ProxyRpcServer::new(
        RpcConfig::default(),
        Arc::new(EthereumProxy::new(Arc::new(InMemoryNode::new()))),
    );
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .serve(listener, async move {
                let _ = rx.await;
            })
            .await
    });
    tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}
