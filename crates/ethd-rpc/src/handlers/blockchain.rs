// crates/ethd-rpc/src/handlers/blockchain.rs
//
// Blockchain handlers: getbestblockhash, getblock, getblockcount,
// getblockhash, getdifficulty.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use ethd_core::error::EthdError;
use ethd_core::units::{parse_quantity, parse_u64_quantity, to_quantity};

use super::{to_json, Params};
use crate::proxy::EthereumProxy;
use crate::registry::{Category, MethodSpec};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Legacy view of a block. Fields with no native equivalent are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub confirmations: u64,
    pub strippedsize: Option<u64>,
    pub size: Option<u64>,
    pub weight: Option<u64>,
    pub height: Option<u64>,
    pub version: Option<u64>,
    #[serde(rename = "versionHex")]
    pub version_hex: Option<String>,
    pub merkleroot: Option<String>,
    /// Transaction ids in block order.
    pub tx: Vec<String>,
    pub time: u64,
    pub mediantime: Option<u64>,
    pub nonce: u64,
    pub bits: Option<String>,
    pub difficulty: f64,
    pub chainwork: Option<String>,
    pub previousblockhash: Option<String>,
}

/// Result of `getblock`: the full view, or only the hash when not verbose.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GetBlockResult {
    Verbose(Box<BlockInfo>),
    Hash(String),
}

/// Difficulty of a native block, preferring the cumulative value.
fn block_difficulty(block: &Value) -> Result<f64, EthdError> {
    let raw = match block.get("totalDifficulty") {
        Some(v) if !v.is_null() => v,
        _ => &block["difficulty"],
    };
    Ok(parse_quantity(raw)? as f64)
}

fn block_hash(block: &Value) -> Result<String, EthdError> {
    block["hash"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(EthdError::block_not_found)
}

// ---------------------------------------------------------------------------
// Translators
// ---------------------------------------------------------------------------

impl EthereumProxy {
    /// Hash of the chain head.
    pub async fn getbestblockhash(&self) -> Result<String, EthdError> {
        let block = self.block_by_number(json!("latest")).await?;
        block_hash(&block)
    }

    /// Block `blockhash`, as the legacy view or (when `verbose` is false)
    /// just its hash.
    pub async fn getblock(&self, blockhash: &str, verbose: bool) -> Result<GetBlockResult, EthdError> {
        let block = self.block_by_hash(blockhash).await?;
        if !verbose {
            return Ok(GetBlockResult::Hash(block_hash(&block)?));
        }

        let confirmations = self.confirmations(&block).await?;
        let tx = match &block["transactions"] {
            Value::Array(items) => items
                .iter()
                .filter_map(|t| match t {
                    Value::String(h) => Some(h.clone()),
                    other => other["hash"].as_str().map(str::to_string),
                })
                .collect(),
            _ => Vec::new(),
        };
        let height = match &block["number"] {
            Value::Null => None,
            n => Some(parse_u64_quantity(n)?),
        };

        Ok(GetBlockResult::Verbose(Box::new(BlockInfo {
            hash: block_hash(&block)?,
            confirmations,
            strippedsize: None,
            size: None,
            weight: None,
            height,
            version: None,
            version_hex: None,
            merkleroot: None,
            tx,
            time: parse_u64_quantity(&block["timestamp"])?,
            mediantime: None,
            nonce: parse_u64_quantity(&block["nonce"])?,
            bits: None,
            difficulty: block_difficulty(&block)?,
            chainwork: None,
            previousblockhash: block["parentHash"].as_str().map(str::to_string),
        })))
    }

    /// Height of the chain head.
    pub async fn getblockcount(&self) -> Result<u64, EthdError> {
        self.head_number().await
    }

    /// Hash of the block at `height`.
    pub async fn getblockhash(&self, height: u64) -> Result<String, EthdError> {
        let block = self
            .block_by_number(json!(to_quantity(u128::from(height))))
            .await?;
        block_hash(&block)
    }

    /// Current difficulty, taken from the node's reported hash rate.
    pub async fn getdifficulty(&self) -> Result<f64, EthdError> {
        let hashrate = self.call("eth_hashrate", vec![]).await?;
        Ok(parse_quantity(&hashrate)? as f64)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_getbestblockhash(proxy: &EthereumProxy, _params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move { to_json(proxy.getbestblockhash().await?) })
}

fn handle_getblock(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let blockhash = params.string(0, "blockhash")?;
        let verbose = params.bool_or(1, "verbose", true)?;
        to_json(proxy.getblock(&blockhash, verbose).await?)
    })
}

fn handle_getblockcount(proxy: &EthereumProxy, _params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move { to_json(proxy.getblockcount().await?) })
}

fn handle_getblockhash(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let height = params.u64(0, "height")?;
        to_json(proxy.getblockhash(height).await?)
    })
}

fn handle_getdifficulty(proxy: &EthereumProxy, _params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move { to_json(proxy.getdifficulty().await?) })
}

pub(crate) static METHODS: &[MethodSpec] = &[
    MethodSpec {
        name: "getbestblockhash",
        category: Category::Blockchain,
        summary: "getbestblockhash",
        doc: "getbestblockhash\n\
              \n\
              Returns the hash of the best (tip) block in the longest blockchain.\n\
              \n\
              Result:\n\
              \"hex\"      (string) the block hash hex encoded\n\
              \n\
              Examples:\n\
              > ethereum-cli getbestblockhash",
        min_params: 0,
        max_params: 0,
        handler: handle_getbestblockhash,
    },
    MethodSpec {
        name: "getblock",
        category: Category::Blockchain,
        summary: "getblock \"blockhash\" ( verbose )",
        doc: "getblock \"blockhash\" ( verbose )\n\
              \n\
              If verbose is false, returns the block hash.\n\
              If verbose is true, returns an Object with information about block <hash>.\n\
              Fields with no Ethereum equivalent (size, merkleroot, bits, ...) are null.\n\
              \n\
              Arguments:\n\
              1. \"blockhash\"          (string, required) The block hash\n\
              2. verbose                (boolean, optional, default=true)\n\
              \n\
              Result (for verbose = true):\n\
              {\n\
                \"hash\" : \"hash\",     (string) the block hash\n\
                \"confirmations\" : n,   (numeric) The number of confirmations\n\
                \"height\" : n,          (numeric) The block height or index\n\
                \"tx\" : [ \"transactionid\", ... ],\n\
                \"time\" : ttt,          (numeric) The block time in seconds since epoch\n\
                \"nonce\" : n,           (numeric) The nonce\n\
                \"difficulty\" : x.xxx,  (numeric) The total difficulty\n\
                \"previousblockhash\" : \"hash\"\n\
              }\n\
              \n\
              Examples:\n\
              > ethereum-cli getblock \"0x8f6d...\"",
        min_params: 1,
        max_params: 2,
        handler: handle_getblock,
    },
    MethodSpec {
        name: "getblockcount",
        category: Category::Blockchain,
        summary: "getblockcount",
        doc: "getblockcount\n\
              \n\
              Returns the number of blocks in the longest blockchain.\n\
              \n\
              Result:\n\
              n    (numeric) The current block count\n\
              \n\
              Examples:\n\
              > ethereum-cli getblockcount",
        min_params: 0,
        max_params: 0,
        handler: handle_getblockcount,
    },
    MethodSpec {
        name: "getblockhash",
        category: Category::Blockchain,
        summary: "getblockhash height",
        doc: "getblockhash height\n\
              \n\
              Returns hash of block in best-block-chain at height provided.\n\
              \n\
              Arguments:\n\
              1. height         (numeric, required) The height index\n\
              \n\
              Result:\n\
              \"hash\"         (string) The block hash\n\
              \n\
              Examples:\n\
              > ethereum-cli getblockhash 1000",
        min_params: 1,
        max_params: 1,
        handler: handle_getblockhash,
    },
    MethodSpec {
        name: "getdifficulty",
        category: Category::Blockchain,
        summary: "getdifficulty",
        doc: "getdifficulty\n\
              \n\
              Returns the node's current hash-rate-derived difficulty.\n\
              \n\
              Result:\n\
              n.nnn       (numeric) the proof-of-work difficulty\n\
              \n\
              Examples:\n\
              > ethereum-cli getdifficulty",
        min_params: 0,
        max_params: 0,
        handler: handle_getdifficulty,
    },
];
