// crates/ethd-rpc/src/handlers/util.rs
//
// Utility handlers: validateaddress.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ethd_core::error::EthdError;

use super::{to_json, Params};
use crate::proxy::EthereumProxy;
use crate::registry::{Category, MethodSpec};

/// Result of `validateaddress`. Only `isvalid` is present for malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressValidation {
    pub isvalid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ismine: Option<bool>,
}

/// `0x` followed by 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(digits) => digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

impl EthereumProxy {
    pub async fn validateaddress(&self, address: &str) -> Result<AddressValidation, EthdError> {
        if !is_valid_address(address) {
            return Ok(AddressValidation {
                isvalid: false,
                address: None,
                ismine: None,
            });
        }
        let accounts = self.accounts().await?;
        let ismine = accounts.iter().any(|a| a.eq_ignore_ascii_case(address));
        Ok(AddressValidation {
            isvalid: true,
            address: Some(address.to_string()),
            ismine: Some(ismine),
        })
    }
}

fn handle_validateaddress(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let address = params.string(0, "address")?;
        to_json(proxy.validateaddress(&address).await?)
    })
}

pub(crate) static METHODS: &[MethodSpec] = &[MethodSpec {
    name: "validateaddress",
    category: Category::Util,
    summary: "validateaddress \"address\"",
    doc: "validateaddress \"address\"\n\
          \n\
          Return information about the given Ethereum address.\n\
          \n\
          Arguments:\n\
          1. \"address\"     (string, required) The address to validate\n\
          \n\
          Result:\n\
          {\n\
            \"isvalid\" : true|false,   (boolean) If the address is valid or not\n\
            \"address\" : \"address\",  (string) The address validated\n\
            \"ismine\" : true|false     (boolean) If the address is a local account\n\
          }\n\
          \n\
          Examples:\n\
          > ethereum-cli validateaddress \"0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c\"",
    min_params: 1,
    max_params: 1,
    handler: handle_validateaddress,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ethd_core::memory::InMemoryNode;

    const MINE: &str = "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c";

    #[test]
    fn test_address_shape() {
        assert!(is_valid_address(MINE));
        assert!(!is_valid_address("5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c"));
        assert!(!is_valid_address("0x5a0b"));
        assert!(!is_valid_address("0xzz0b54d5dc17e0aadc383d2db43b0a0d3e029c4c"));
    }

    #[tokio::test]
    async fn test_validateaddress() {
        let node = Arc::new(InMemoryNode::new());
        node.add_account(MINE, 0);
        let proxy = EthereumProxy::new(node);

        let mine = proxy.validateaddress(&MINE.to_uppercase().replacen("0X", "0x", 1)).await.unwrap();
        assert!(mine.isvalid);
        assert_eq!(mine.ismine, Some(true));

        let other = proxy
            .validateaddress("0x0000000000000000000000000000000000000001")
            .await
            .unwrap();
        assert_eq!(other.ismine, Some(false));

        let bad = to_json(proxy.validateaddress("nope").await.unwrap()).unwrap();
        assert_eq!(bad, serde_json::json!({"isvalid": false}));
    }
}
