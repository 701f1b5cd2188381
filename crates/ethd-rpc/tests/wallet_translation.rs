// crates/ethd-rpc/tests/wallet_translation.rs
//
// Wallet translators and dispatch against the in-memory node.

use std::sync::Arc;

use serde_json::{json, Value};

use ethd_core::memory::{InMemoryNode, MemoryTransaction};
use ethd_core::units::WEI_PER_ETHER;
use ethd_rpc::handlers::wallet::TransactionDetail;
use ethd_rpc::{Dispatcher, EthereumProxy};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ALICE: &str = "0x00000000000000000000000000000000000000a1";
const BOB: &str = "0x00000000000000000000000000000000000000b2";
const CAROL: &str = "0x00000000000000000000000000000000000000c3";

/// Node with two local accounts holding 1.5 and 2.5 ETH.
fn two_account_node() -> Arc<InMemoryNode> {
    let node = Arc::new(InMemoryNode::new());
    node.add_account(ALICE, WEI_PER_ETHER * 3 / 2);
    node.add_account(BOB, WEI_PER_ETHER * 5 / 2);
    node
}

fn setup() -> (Arc<InMemoryNode>, Arc<EthereumProxy>, Dispatcher) {
    let node = two_account_node();
    let proxy = Arc::new(EthereumProxy::new(node.clone()));
    let dispatcher = Dispatcher::new(proxy.clone());
    (node, proxy, dispatcher)
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_getbalance_sums_accounts() {
    let (_node, proxy, dispatcher) = setup();
    assert_eq!(proxy.getbalance(None, 1, true).await.unwrap(), 4.0);
    assert_eq!(dispatcher.call("getbalance", vec![]).await.unwrap(), json!(4.0));
    // minconf and include_watchonly are accepted and ignored
    assert_eq!(
        dispatcher
            .call("getbalance", vec![json!("*"), json!(6), json!(false)])
            .await
            .unwrap(),
        json!(4.0)
    );
}

#[tokio::test]
async fn test_listaccounts_labels_by_position() {
    let (_node, _proxy, dispatcher) = setup();
    let accounts = dispatcher.call("listaccounts", vec![]).await.unwrap();
    assert_eq!(accounts, json!({"Account #0": 1.5, "Account #1": 2.5}));

    let keys: Vec<&String> = accounts.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["Account #0", "Account #1"]);
}

#[tokio::test]
async fn test_getwalletinfo_defaults_fee() {
    let (_node, proxy, _dispatcher) = setup();
    let info = proxy.getwalletinfo().await.unwrap();
    assert_eq!(info.balance, 4.0);
    assert_eq!(info.accountcount, 2);
    assert!((info.paytxfee - 0.00042).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// gettransaction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_gettransaction_counts_confirmations() {
    let (node, proxy, _dispatcher) = setup();
    node.mine_empty_blocks(2);
    node.mine_block(vec![MemoryTransaction::transfer(CAROL, ALICE, WEI_PER_ETHER)]);
    node.mine_empty_blocks(10);

    let block = node
        .block_transactions(2)
        .expect("block 2 holds the transfer");
    let info = proxy.gettransaction(&block[0], false).await.unwrap();

    assert_eq!(info.confirmations, 10);
    assert_eq!(info.amount, 1.0);
    assert!(info.blockhash.is_some());
    assert_eq!(info.details.len(), 1);
    match &info.details[0] {
        TransactionDetail::Receive(receive) => {
            assert_eq!(receive.address, ALICE);
            assert_eq!(receive.amount, 1.0);
        }
        other => panic!("expected a receive entry, got {:?}", other),
    }
}

#[tokio::test]
async fn test_self_transfer_has_both_sides() {
    let (node, proxy, _dispatcher) = setup();
    node.mine_block(vec![MemoryTransaction::transfer(ALICE, ALICE, WEI_PER_ETHER / 2)]);
    node.mine_empty_blocks(1);
    let txid = node.block_transactions(0).unwrap().remove(0);

    let value = serde_json::to_value(proxy.gettransaction(&txid, false).await.unwrap()).unwrap();
    let details = value["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["category"], json!("receive"));
    assert_eq!(details[0]["amount"], json!(0.5));
    assert_eq!(details[1]["category"], json!("send"));
    assert_eq!(details[1]["amount"], json!(-0.5));
    // 21000 gas at 20 gwei
    let fee = details[1]["fee"].as_f64().unwrap();
    assert!((fee - 0.00042).abs() < 1e-12);
    assert_eq!(details[1]["abandoned"], json!(false));
}

#[tokio::test]
async fn test_pending_send_has_no_fee() {
    let (node, proxy, _dispatcher) = setup();
    node.mine_empty_blocks(1);
    let txid = node.submit_pending(MemoryTransaction::transfer(BOB, CAROL, WEI_PER_ETHER));

    let value = serde_json::to_value(proxy.gettransaction(&txid, false).await.unwrap()).unwrap();
    assert_eq!(value["confirmations"], json!(0));
    assert!(value.get("blockhash").is_none());
    assert_eq!(value["details"][0]["category"], json!("send"));
    assert!(value["details"][0]["fee"].is_null());
    assert!(value["details"][0].as_object().unwrap().contains_key("fee"));
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() {
    let (_node, _proxy, dispatcher) = setup();
    let err = dispatcher
        .call("gettransaction", vec![json!("0x1234")])
        .await
        .unwrap_err();
    assert_eq!(err.code(), -5);
    assert_eq!(err.message(), "Invalid or non-wallet transaction id");
}

// ---------------------------------------------------------------------------
// Fees and sending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_settxfee_contract() {
    let (_node, proxy, dispatcher) = setup();

    assert_eq!(dispatcher.call("settxfee", vec![json!("abc")]).await.unwrap(), json!(false));
    assert_eq!(dispatcher.call("settxfee", vec![json!(true)]).await.unwrap(), json!(false));

    for bad in [json!(0), json!(-0.5), json!("-1")] {
        let err = dispatcher.call("settxfee", vec![bad]).await.unwrap_err();
        assert_eq!(err.code(), -3);
    }
    assert_eq!(proxy.paytxfee().await, None);

    assert_eq!(dispatcher.call("settxfee", vec![json!("0.00084")]).await.unwrap(), json!(true));
    assert_eq!(proxy.paytxfee().await, Some(0.00084));
    assert_eq!(proxy.gas_quote().await.unwrap().gas_price, 40_000_000_000);
}

#[tokio::test]
async fn test_sendtoaddress_uses_first_account_and_fee() {
    let (node, proxy, dispatcher) = setup();
    proxy.settxfee(0.00042).await.unwrap();

    let txid = dispatcher
        .call("sendtoaddress", vec![json!(CAROL), json!("0.25")])
        .await
        .unwrap();
    assert!(txid.as_str().unwrap().starts_with("0x"));

    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["from"], json!(ALICE));
    assert_eq!(sent[0]["to"], json!(CAROL));
    assert_eq!(sent[0]["gas"], json!("0x5208"));
    assert_eq!(sent[0]["gasPrice"], json!("0x4a817c800"));
    assert_eq!(sent[0]["value"], json!("0x3782dace9d90000"));
}

#[tokio::test]
async fn test_sendtoaddress_prefers_coinbase() {
    let (node, _proxy, dispatcher) = setup();
    node.set_coinbase(BOB);
    node.set_gas_price(1);
    dispatcher
        .call("sendtoaddress", vec![json!(CAROL), json!(1)])
        .await
        .unwrap();
    let sent: Vec<Value> = node.sent_transactions();
    assert_eq!(sent[0]["from"], json!(BOB));
    assert_eq!(sent[0]["gasPrice"], json!("0x1"));
}

#[tokio::test]
async fn test_sendtoaddress_rejects_bad_input() {
    let (node, _proxy, dispatcher) = setup();

    let err = dispatcher
        .call("sendtoaddress", vec![json!("carol"), json!(1)])
        .await
        .unwrap_err();
    assert_eq!((err.code(), err.message().as_str()), (-1, "Invalid address"));

    let err = dispatcher
        .call("sendtoaddress", vec![json!(CAROL), json!("lots")])
        .await
        .unwrap_err();
    assert_eq!((err.code(), err.message().as_str()), (-1, "Invalid amount"));

    let err = dispatcher
        .call("sendtoaddress", vec![json!(CAROL), json!(0)])
        .await
        .unwrap_err();
    assert_eq!((err.code(), err.message().as_str()), (-3, "Amount out of range"));

    assert!(node.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_node_errors_pass_through() {
    let (node, _proxy, dispatcher) = setup();
    node.inject_failure(
        "eth_accounts",
        ethd_core::EthdError::bad_response(-32000, "account locked"),
    );
    let err = dispatcher.call("getbalance", vec![]).await.unwrap_err();
    assert_eq!(err.code(), -32000);
    assert_eq!(err.message(), "account locked");
}
