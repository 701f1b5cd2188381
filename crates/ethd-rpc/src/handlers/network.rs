// crates/ethd-rpc/src/handlers/network.rs
//
// Network handlers: getconnectioncount.

use futures::future::BoxFuture;
use serde_json::Value;

use ethd_core::error::EthdError;
use ethd_core::units::parse_u64_quantity;

use super::{to_json, Params};
use crate::proxy::EthereumProxy;
use crate::registry::{Category, MethodSpec};

impl EthereumProxy {
    /// Number of peers the node is connected to.
    pub async fn getconnectioncount(&self) -> Result<u64, EthdError> {
        let peers = self.call("net_peerCount", vec![]).await?;
        parse_u64_quantity(&peers)
    }
}

fn handle_getconnectioncount(proxy: &EthereumProxy, _params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move { to_json(proxy.getconnectioncount().await?) })
}

pub(crate) static METHODS: &[MethodSpec] = &[MethodSpec {
    name: "getconnectioncount",
    category: Category::Network,
    summary: "getconnectioncount",
    doc: "getconnectioncount\n\
          \n\
          Returns the number of connections to other nodes.\n\
          \n\
          Result:\n\
          n          (numeric) The connection count\n\
          \n\
          Examples:\n\
          > ethereum-cli getconnectioncount",
    min_params: 0,
    max_params: 0,
    handler: handle_getconnectioncount,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ethd_core::memory::InMemoryNode;

    #[tokio::test]
    async fn test_peer_count() {
        let node = Arc::new(InMemoryNode::new());
        node.set_peer_count(25);
        let proxy = EthereumProxy::new(node);
        assert_eq!(proxy.getconnectioncount().await.unwrap(), 25);
    }
}
