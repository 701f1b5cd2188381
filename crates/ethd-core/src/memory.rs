// crates/ethd-core/src/memory.rs
//
// In-memory Ethereum node implementing the `NodeTransport` trait.
//
// Answers the subset of the eth_* / net_* API the proxy and poller use,
// from state held in a HashMap-backed chain. Used by the test suites of the
// rpc and poller crates and for running the daemon without a real node.
//
// Hashes are deterministic ("0x" + 64 hex digits of a sequence number) so
// tests can predict them.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{EthdError, TransportError};
use crate::transport::NodeTransport;
use crate::units::{parse_quantity, to_quantity};

/// geth's code for generic server-side failures.
const NODE_SERVER_ERROR: i64 = -32000;
/// geth's code for unknown methods.
const NODE_METHOD_NOT_FOUND: i64 = -32601;

/// First block timestamp; each later block is 15 seconds apart.
const GENESIS_TIMESTAMP: u64 = 1_500_000_000;
const BLOCK_TIME: u64 = 15;

/// A transaction to be mined or submitted to the pending pool.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTransaction {
    pub from: String,
    pub to: Option<String>,
    /// Amount in wei.
    pub value: u128,
    /// Gas price in wei.
    pub gas_price: u128,
    /// Gas consumed once mined (also used as the gas limit).
    pub gas_used: u64,
    pub input: String,
}

impl MemoryTransaction {
    /// A plain value transfer costing 21000 gas at 20 gwei.
    pub fn transfer(from: &str, to: &str, value: u128) -> Self {
        Self {
            from: from.to_string(),
            to: Some(to.to_string()),
            value,
            gas_price: 20_000_000_000,
            gas_used: 21_000,
            input: "0x".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterSource {
    Blocks,
    Pending,
}

#[derive(Debug)]
struct MemoryFilter {
    source: FilterSource,
    changes: Vec<Value>,
}

#[derive(Debug, Default)]
struct ChainData {
    accounts: Vec<String>,
    balances: HashMap<String, u128>,
    coinbase: Option<String>,
    gas_price: u128,
    peer_count: u64,
    difficulty: u128,
    hashrate: u128,
    /// Block objects in height order, transaction hashes only.
    blocks: Vec<Value>,
    transactions: HashMap<String, Value>,
    receipts: HashMap<String, Value>,
    filters: HashMap<String, MemoryFilter>,
    next_filter: u64,
    next_hash: u64,
    failures: HashMap<String, VecDeque<EthdError>>,
    calls: Vec<String>,
    sent: Vec<Value>,
}

impl ChainData {
    fn next_hash(&mut self) -> String {
        self.next_hash += 1;
        format!("0x{:064x}", self.next_hash)
    }

    fn transaction_object(&mut self, tx: &MemoryTransaction, nonce: usize) -> (String, Value) {
        let hash = self.next_hash();
        let object = json!({
            "hash": hash,
            "nonce": to_quantity(nonce as u128),
            "blockHash": Value::Null,
            "blockNumber": Value::Null,
            "transactionIndex": Value::Null,
            "from": tx.from,
            "to": tx.to,
            "value": to_quantity(tx.value),
            "gas": to_quantity(u128::from(tx.gas_used)),
            "gasPrice": to_quantity(tx.gas_price),
            "input": tx.input,
        });
        (hash, object)
    }

    fn push_filter_change(&mut self, source: FilterSource, hash: &str) {
        for filter in self.filters.values_mut() {
            if filter.source == source {
                filter.changes.push(Value::String(hash.to_string()));
            }
        }
    }

    fn block_by_number(&self, tag: &Value) -> Result<Option<&Value>, EthdError> {
        let index = match tag.as_str() {
            Some("latest") | Some("pending") => match self.blocks.len() {
                0 => return Ok(None),
                n => n - 1,
            },
            Some("earliest") => 0,
            _ => parse_quantity(tag)? as usize,
        };
        Ok(self.blocks.get(index))
    }

    fn with_full_transactions(&self, block: &Value) -> Value {
        let mut block = block.clone();
        if let Some(Value::Array(hashes)) = block.get("transactions").cloned() {
            let full: Vec<Value> = hashes
                .iter()
                .filter_map(|h| h.as_str().and_then(|h| self.transactions.get(h)).cloned())
                .collect();
            block["transactions"] = Value::Array(full);
        }
        block
    }
}

/// In-memory node with scripted chain state.
#[derive(Debug)]
pub struct InMemoryNode {
    data: Mutex<ChainData>,
}

impl InMemoryNode {
    /// Create an empty node: no accounts, no blocks, gas price 20 gwei.
    pub fn new() -> Self {
        Self {
            data: Mutex::new(ChainData {
                gas_price: 20_000_000_000,
                difficulty: 131_072,
                ..ChainData::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ChainData> {
        self.data.lock().expect("Mutex poisoned")
    }

    // -----------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------

    /// Register a wallet account holding `balance` wei.
    pub fn add_account(&self, address: &str, balance: u128) {
        let mut data = self.state();
        data.accounts.push(address.to_string());
        data.balances.insert(address.to_lowercase(), balance);
    }

    pub fn set_coinbase(&self, address: &str) {
        self.state().coinbase = Some(address.to_string());
    }

    /// Gas price in wei reported by eth_gasPrice.
    pub fn set_gas_price(&self, wei: u128) {
        self.state().gas_price = wei;
    }

    pub fn set_peer_count(&self, peers: u64) {
        self.state().peer_count = peers;
    }

    /// Difficulty assigned to subsequently mined blocks.
    pub fn set_difficulty(&self, difficulty: u128) {
        self.state().difficulty = difficulty;
    }

    /// Hash rate reported by eth_hashrate.
    pub fn set_hashrate(&self, hashes_per_second: u128) {
        self.state().hashrate = hashes_per_second;
    }

    /// Append a block containing `txs` and return its hash.
    ///
    /// The first block mined has number 0. Block filters see the new hash.
    pub fn mine_block(&self, txs: Vec<MemoryTransaction>) -> String {
        let mut data = self.state();
        let number = data.blocks.len() as u64;
        let parent = data
            .blocks
            .last()
            .and_then(|b| b["hash"].as_str().map(str::to_string))
            .unwrap_or_else(|| format!("0x{:064x}", 0));
        let total_difficulty = data
            .blocks
            .last()
            .map(|b| parse_quantity(&b["totalDifficulty"]).unwrap_or(0))
            .unwrap_or(0)
            + data.difficulty;

        let block_hash = data.next_hash();
        let mut hashes = Vec::with_capacity(txs.len());
        let mut gas_total: u64 = 0;
        for (index, tx) in txs.iter().enumerate() {
            let (hash, mut object) = data.transaction_object(tx, index);
            object["blockHash"] = json!(block_hash);
            object["blockNumber"] = json!(to_quantity(u128::from(number)));
            object["transactionIndex"] = json!(to_quantity(index as u128));
            let receipt = json!({
                "transactionHash": hash,
                "transactionIndex": to_quantity(index as u128),
                "blockHash": block_hash,
                "blockNumber": to_quantity(u128::from(number)),
                "from": tx.from,
                "to": tx.to,
                "gasUsed": to_quantity(u128::from(tx.gas_used)),
                "status": "0x1",
            });
            gas_total += tx.gas_used;
            data.transactions.insert(hash.clone(), object);
            data.receipts.insert(hash.clone(), receipt);
            hashes.push(Value::String(hash));
        }

        let miner = data.coinbase.clone().unwrap_or_else(|| format!("0x{:040x}", 0));
        let block = json!({
            "number": to_quantity(u128::from(number)),
            "hash": block_hash,
            "parentHash": parent,
            "nonce": "0x0000000000000000",
            "sha3Uncles": format!("0x{:064x}", 0),
            "miner": miner,
            "difficulty": to_quantity(data.difficulty),
            "totalDifficulty": to_quantity(total_difficulty),
            "gasLimit": to_quantity(8_000_000),
            "gasUsed": to_quantity(u128::from(gas_total)),
            "timestamp": to_quantity(u128::from(GENESIS_TIMESTAMP + number * BLOCK_TIME)),
            "transactions": hashes,
            "uncles": [],
        });
        data.blocks.push(block);
        data.push_filter_change(FilterSource::Blocks, &block_hash);
        block_hash
    }

    /// Mine `count` empty blocks.
    pub fn mine_empty_blocks(&self, count: usize) {
        for _ in 0..count {
            self.mine_block(Vec::new());
        }
    }

    /// Add `tx` to the pending pool and return its hash. Pending filters see
    /// the new hash.
    pub fn submit_pending(&self, tx: MemoryTransaction) -> String {
        let mut data = self.state();
        let nonce = data.sent.len();
        let (hash, object) = data.transaction_object(&tx, nonce);
        data.transactions.insert(hash.clone(), object);
        data.push_filter_change(FilterSource::Pending, &hash);
        hash
    }

    // -----------------------------------------------------------------
    // Test hooks
    // -----------------------------------------------------------------

    /// Make the next call to `method` fail with `error`. Queued failures are
    /// consumed in order, one per call.
    pub fn inject_failure(&self, method: &str, error: EthdError) {
        self.state()
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(error);
    }

    /// Forget every installed filter, as a restarted node would.
    pub fn drop_filters(&self) {
        self.state().filters.clear();
    }

    /// Method names of every call received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of calls received for `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|m| *m == method).count()
    }

    /// Transaction objects received through eth_sendTransaction.
    pub fn sent_transactions(&self) -> Vec<Value> {
        self.state().sent.clone()
    }

    pub fn filter_count(&self) -> usize {
        self.state().filters.len()
    }

    /// Transaction hashes of the block at height `number`.
    pub fn block_transactions(&self, number: usize) -> Option<Vec<String>> {
        let data = self.state();
        let block = data.blocks.get(number)?;
        Some(
            block["transactions"]
                .as_array()?
                .iter()
                .filter_map(|h| h.as_str().map(str::to_string))
                .collect(),
        )
    }

    // -----------------------------------------------------------------
    // Method handling
    // -----------------------------------------------------------------

    fn handle(&self, method: &str, params: &[Value]) -> Result<Value, EthdError> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| TransportError::Io(format!("Mutex poisoned: {}", e)))?;

        data.calls.push(method.to_string());
        if let Some(error) = data.failures.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(error);
        }

        let param = |i: usize| params.get(i).cloned().unwrap_or(Value::Null);

        match method {
            "eth_accounts" => Ok(json!(data.accounts)),
            "eth_coinbase" => match &data.coinbase {
                Some(coinbase) => Ok(json!(coinbase)),
                None => Err(EthdError::bad_response(
                    NODE_SERVER_ERROR,
                    "etherbase must be explicitly specified",
                )),
            },
            "eth_getBalance" => {
                let address = param(0).as_str().unwrap_or_default().to_lowercase();
                let balance = data.balances.get(&address).copied().unwrap_or(0);
                Ok(json!(to_quantity(balance)))
            }
            "eth_blockNumber" => match data.blocks.len() {
                0 => Ok(Value::Null),
                n => Ok(json!(to_quantity(n as u128 - 1))),
            },
            "eth_getBlockByHash" => {
                let hash = param(0);
                let block = data.blocks.iter().find(|b| b["hash"] == hash);
                Ok(match block {
                    Some(block) if param(1).as_bool() == Some(true) => {
                        data.with_full_transactions(block)
                    }
                    Some(block) => block.clone(),
                    None => Value::Null,
                })
            }
            "eth_getBlockByNumber" => {
                let block = data.block_by_number(&param(0))?;
                Ok(match block {
                    Some(block) if param(1).as_bool() == Some(true) => {
                        data.with_full_transactions(block)
                    }
                    Some(block) => block.clone(),
                    None => Value::Null,
                })
            }
            "eth_getTransactionByHash" => {
                let hash = param(0);
                Ok(hash
                    .as_str()
                    .and_then(|h| data.transactions.get(h))
                    .cloned()
                    .unwrap_or(Value::Null))
            }
            "eth_getTransactionReceipt" => {
                let hash = param(0);
                Ok(hash
                    .as_str()
                    .and_then(|h| data.receipts.get(h))
                    .cloned()
                    .unwrap_or(Value::Null))
            }
            "eth_gasPrice" => Ok(json!(to_quantity(data.gas_price))),
            "eth_hashrate" => Ok(json!(to_quantity(data.hashrate))),
            "net_peerCount" => Ok(json!(to_quantity(u128::from(data.peer_count)))),
            "eth_newBlockFilter" | "eth_newPendingTransactionFilter" => {
                let source = if method == "eth_newBlockFilter" {
                    FilterSource::Blocks
                } else {
                    FilterSource::Pending
                };
                data.next_filter += 1;
                let id = to_quantity(u128::from(data.next_filter));
                data.filters.insert(
                    id.clone(),
                    MemoryFilter {
                        source,
                        changes: Vec::new(),
                    },
                );
                Ok(json!(id))
            }
            "eth_getFilterChanges" => {
                let id = param(0).as_str().unwrap_or_default().to_string();
                match data.filters.get_mut(&id) {
                    Some(filter) => Ok(Value::Array(std::mem::take(&mut filter.changes))),
                    None => Err(EthdError::bad_response(NODE_SERVER_ERROR, "filter not found")),
                }
            }
            "eth_uninstallFilter" => {
                let id = param(0).as_str().unwrap_or_default().to_string();
                Ok(json!(data.filters.remove(&id).is_some()))
            }
            "eth_sendTransaction" => {
                let request = param(0);
                let from = request["from"].as_str().unwrap_or_default().to_string();
                if !data.accounts.iter().any(|a| a.eq_ignore_ascii_case(&from)) {
                    return Err(EthdError::bad_response(NODE_SERVER_ERROR, "unknown account"));
                }
                let tx = MemoryTransaction {
                    from,
                    to: request["to"].as_str().map(str::to_string),
                    value: parse_quantity(&request["value"])?,
                    gas_price: parse_quantity(&request["gasPrice"])?,
                    gas_used: parse_quantity(&request["gas"])? as u64,
                    input: request["data"].as_str().unwrap_or("0x").to_string(),
                };
                let nonce = data.sent.len();
                let (hash, object) = data.transaction_object(&tx, nonce);
                data.transactions.insert(hash.clone(), object);
                data.push_filter_change(FilterSource::Pending, &hash);
                data.sent.push(request);
                Ok(json!(hash))
            }
            other => Err(EthdError::bad_response(
                NODE_METHOD_NOT_FOUND,
                format!("The method {} does not exist/is not available", other),
            )),
        }
    }
}

impl Default for InMemoryNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeTransport for InMemoryNode {
    async fn call_with_id(
        &self,
        method: &str,
        params: Vec<Value>,
        _id: Option<u64>,
    ) -> Result<Value, EthdError> {
        self.handle(method, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b2";

    #[tokio::test]
    async fn test_empty_chain_has_no_head() {
        let node = InMemoryNode::new();
        assert_eq!(node.call("eth_blockNumber", vec![]).await.unwrap(), Value::Null);
        let latest = node
            .call("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await
            .unwrap();
        assert!(latest.is_null());
    }

    #[tokio::test]
    async fn test_mined_transaction_is_indexed() {
        let node = InMemoryNode::new();
        node.add_account(ALICE, 0);
        node.mine_empty_blocks(2);
        let block_hash = node.mine_block(vec![MemoryTransaction::transfer(ALICE, BOB, 5)]);

        assert_eq!(node.call("eth_blockNumber", vec![]).await.unwrap(), json!("0x2"));

        let block = node
            .call("eth_getBlockByHash", vec![json!(block_hash), json!(false)])
            .await
            .unwrap();
        let tx_hash = block["transactions"][0].clone();
        let tx = node.call("eth_getTransactionByHash", vec![tx_hash.clone()]).await.unwrap();
        assert_eq!(tx["blockHash"], json!(block_hash));
        assert_eq!(tx["value"], json!("0x5"));

        let receipt = node.call("eth_getTransactionReceipt", vec![tx_hash]).await.unwrap();
        assert_eq!(receipt["gasUsed"], json!("0x5208"));
    }

    #[tokio::test]
    async fn test_filters_receive_new_hashes() {
        let node = InMemoryNode::new();
        let blocks = node.call("eth_newBlockFilter", vec![]).await.unwrap();
        let pending = node.call("eth_newPendingTransactionFilter", vec![]).await.unwrap();

        let block_hash = node.mine_block(Vec::new());
        let tx_hash = node.submit_pending(MemoryTransaction::transfer(ALICE, BOB, 1));

        let changes = node.call("eth_getFilterChanges", vec![blocks.clone()]).await.unwrap();
        assert_eq!(changes, json!([block_hash]));
        let changes = node.call("eth_getFilterChanges", vec![pending]).await.unwrap();
        assert_eq!(changes, json!([tx_hash]));

        // Drained
        let changes = node.call("eth_getFilterChanges", vec![blocks]).await.unwrap();
        assert_eq!(changes, json!([]));
    }

    #[tokio::test]
    async fn test_dropped_filter_is_bad_response() {
        let node = InMemoryNode::new();
        let id = node.call("eth_newBlockFilter", vec![]).await.unwrap();
        node.drop_filters();
        let err = node.call("eth_getFilterChanges", vec![id]).await.unwrap_err();
        assert_eq!(err, EthdError::bad_response(-32000, "filter not found"));
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let node = InMemoryNode::new();
        node.inject_failure("eth_accounts", TransportError::NoData.into());
        assert!(node.call("eth_accounts", vec![]).await.is_err());
        assert_eq!(node.call("eth_accounts", vec![]).await.unwrap(), json!([]));
        assert_eq!(node.call_count("eth_accounts"), 2);
    }

    #[tokio::test]
    async fn test_send_transaction_requires_known_account() {
        let node = InMemoryNode::new();
        node.add_account(ALICE, 10);
        let request = json!({"from": BOB, "to": ALICE, "value": "0x1", "gas": "0x5208", "gasPrice": "0x1"});
        assert!(node.call("eth_sendTransaction", vec![request]).await.is_err());

        let request = json!({"from": ALICE, "to": BOB, "value": "0x1", "gas": "0x5208", "gasPrice": "0x1"});
        let hash = node.call("eth_sendTransaction", vec![request]).await.unwrap();
        assert!(hash.as_str().unwrap().starts_with("0x"));
        assert_eq!(node.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let node = InMemoryNode::new();
        let err = node.call("eth_mining", vec![]).await.unwrap_err();
        assert_eq!(err.code(), -32601);
    }
}
