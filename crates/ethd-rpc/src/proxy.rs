// crates/ethd-rpc/src/proxy.rs
//
// EthereumProxy: owner of the node connection and the fee setting.
//
// The legacy method translators are implemented as `impl EthereumProxy`
// blocks in the handler modules, one per API group. This file holds the
// shared plumbing they build on: node calls, confirmation counting and the
// gas quote used by sendtoaddress.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::RwLock;

use ethd_core::error::EthdError;
use ethd_core::transport::NodeTransport;
use ethd_core::units::{ether_to_wei, parse_quantity, parse_u64_quantity, wei_to_ether};

/// Gas consumed by a plain value transfer.
pub const GAS_AMOUNT: u64 = 21_000;

/// Reference gas price in wei (20 gwei), used to derive [`default_fee`].
pub const GAS_PRICE: u128 = 20_000_000_000;

/// Fee in ether for a plain transfer at the reference gas price (0.00042).
pub fn default_fee() -> f64 {
    wei_to_ether(GAS_PRICE * u128::from(GAS_AMOUNT))
}

/// Gas parameters for an outgoing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    pub gas_amount: u64,
    /// Price per unit of gas, in wei.
    pub gas_price: u128,
}

/// Translates legacy RPC verbs into calls against one node.
pub struct EthereumProxy {
    node: Arc<dyn NodeTransport>,
    /// Fee per transfer in ether, as last set by settxfee.
    paytxfee: RwLock<Option<f64>>,
    started: Instant,
}

impl std::fmt::Debug for EthereumProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumProxy")
            .field("started", &self.started)
            .finish()
    }
}

impl EthereumProxy {
    pub fn new(node: Arc<dyn NodeTransport>) -> Self {
        Self {
            node,
            paytxfee: RwLock::new(None),
            started: Instant::now(),
        }
    }

    pub fn node(&self) -> &Arc<dyn NodeTransport> {
        &self.node
    }

    /// Time since this proxy was created.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, EthdError> {
        self.node.call(method, params).await
    }

    /// Addresses of the node's local accounts.
    pub async fn accounts(&self) -> Result<Vec<String>, EthdError> {
        let value = self.call("eth_accounts", vec![]).await?;
        Ok(serde_json::from_value::<Option<Vec<String>>>(value)?.unwrap_or_default())
    }

    /// Balance of `address` in wei at the latest block.
    pub async fn balance_of(&self, address: &str) -> Result<u128, EthdError> {
        let value = self
            .call("eth_getBalance", vec![json!(address), json!("latest")])
            .await?;
        parse_quantity(&value)
    }

    /// Head height, or `ChainNotSynced` if the node has none yet.
    pub async fn head_number(&self) -> Result<u64, EthdError> {
        let value = self.call("eth_blockNumber", vec![]).await?;
        match value {
            Value::Null => Err(EthdError::ChainNotSynced),
            Value::String(ref s) if s.is_empty() => Err(EthdError::ChainNotSynced),
            other => parse_u64_quantity(&other),
        }
    }

    /// Number of blocks on top of `block`. A block without a number
    /// (pending) has zero confirmations.
    pub async fn confirmations(&self, block: &Value) -> Result<u64, EthdError> {
        let head = self.head_number().await?;
        match block.get("number") {
            None | Some(Value::Null) => Ok(0),
            Some(number) => Ok(head.saturating_sub(parse_u64_quantity(number)?)),
        }
    }

    /// Fetch a block header by hash; `-5 Block not found` when the node
    /// does not know it.
    pub async fn block_by_hash(&self, hash: &str) -> Result<Value, EthdError> {
        let block = self
            .call("eth_getBlockByHash", vec![json!(hash), json!(false)])
            .await?;
        if block.is_null() {
            return Err(EthdError::block_not_found());
        }
        Ok(block)
    }

    /// Fetch a block header by height or tag ("latest").
    pub async fn block_by_number(&self, tag: Value) -> Result<Value, EthdError> {
        let block = self
            .call("eth_getBlockByNumber", vec![tag, json!(false)])
            .await?;
        if block.is_null() {
            return Err(EthdError::block_not_found());
        }
        Ok(block)
    }

    pub async fn paytxfee(&self) -> Option<f64> {
        *self.paytxfee.read().await
    }

    pub(crate) async fn set_paytxfee(&self, fee: f64) {
        *self.paytxfee.write().await = Some(fee);
        tracing::info!("Transaction fee set to {} ETH", fee);
    }

    /// Gas parameters for a plain transfer: derived from the fee set by
    /// settxfee, or the node's suggested price when none was set.
    pub async fn gas_quote(&self) -> Result<GasQuote, EthdError> {
        let gas_price = match self.paytxfee().await {
            Some(fee) => ether_to_wei(fee) / u128::from(GAS_AMOUNT),
            None => parse_quantity(&self.call("eth_gasPrice", vec![]).await?)?,
        };
        Ok(GasQuote {
            gas_amount: GAS_AMOUNT,
            gas_price,
        })
    }
}
