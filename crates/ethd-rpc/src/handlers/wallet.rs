// crates/ethd-rpc/src/handlers/wallet.rs
//
// Wallet handlers: getbalance, gettransaction, getwalletinfo, listaccounts,
// sendtoaddress, settxfee.
//
// The node's account list stands in for the wallet. Amounts are summed in
// wei and reported in ether.

use futures::future::{try_join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use ethd_core::error::EthdError;
use ethd_core::units::{parse_quantity, parse_u64_quantity, to_quantity, wei_to_ether, Wei};

use super::util::is_valid_address;
use super::{to_json, Params};
use crate::proxy::{default_fee, EthereumProxy};
use crate::registry::{Category, MethodSpec};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Incoming side of a wallet transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveDetail {
    pub account: String,
    pub address: String,
    pub category: String,
    pub amount: f64,
    pub label: String,
    pub vout: u32,
}

/// Outgoing side of a wallet transaction. `fee` is only known once mined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendDetail {
    pub account: String,
    pub address: String,
    pub category: String,
    pub amount: f64,
    pub vout: u32,
    pub fee: Option<f64>,
    pub abandoned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionDetail {
    Send(SendDetail),
    Receive(ReceiveDetail),
}

/// Legacy view of a wallet transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub amount: f64,
    pub confirmations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u64>,
    pub trusted: Option<bool>,
    pub walletconflicts: Vec<String>,
    pub txid: String,
    pub time: Option<u64>,
    pub timereceived: Option<u64>,
    pub details: Vec<TransactionDetail>,
    pub hex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub walletname: String,
    pub walletversion: Option<u64>,
    pub balance: f64,
    pub unconfirmed_balance: Option<f64>,
    pub immature_balance: Option<f64>,
    pub txcount: Option<u64>,
    pub keypoololdest: Option<u64>,
    pub keypoolsize: Option<u64>,
    pub unlocked_until: Option<u64>,
    pub paytxfee: f64,
    /// Number of node accounts backing this wallet.
    pub accountcount: usize,
}

// ---------------------------------------------------------------------------
// Translators
// ---------------------------------------------------------------------------

impl EthereumProxy {
    async fn balances(&self, accounts: &[String]) -> Result<Vec<Wei>, EthdError> {
        let balances = try_join_all(accounts.iter().map(|a| self.balance_of(a))).await?;
        Ok(balances.into_iter().map(Wei).collect())
    }

    /// Total balance of every local account, in ether.
    ///
    /// `minconf` and `include_watchonly` are accepted for compatibility and
    /// not applied.
    pub async fn getbalance(
        &self,
        _account: Option<&str>,
        _minconf: u64,
        _include_watchonly: bool,
    ) -> Result<f64, EthdError> {
        let accounts = self.accounts().await?;
        let total: Wei = self.balances(&accounts).await?.into_iter().sum();
        Ok(total.to_ether())
    }

    /// Balance per local account, labelled "Account #N" in node order.
    pub async fn listaccounts(
        &self,
        _minconf: u64,
        _include_watchonly: bool,
    ) -> Result<Map<String, Value>, EthdError> {
        let accounts = self.accounts().await?;
        let balances = self.balances(&accounts).await?;
        Ok(balances
            .into_iter()
            .enumerate()
            .map(|(i, balance)| (format!("Account #{}", i), json!(balance.to_ether())))
            .collect())
    }

    /// Transaction `txid` with one detail entry per local side.
    pub async fn gettransaction(
        &self,
        txid: &str,
        _include_watchonly: bool,
    ) -> Result<TransactionInfo, EthdError> {
        let (transaction, accounts) = tokio::try_join!(
            self.call("eth_getTransactionByHash", vec![json!(txid)]),
            self.accounts()
        )?;
        if transaction.is_null() {
            return Err(EthdError::transaction_not_found());
        }

        let value = parse_quantity(&transaction["value"])?;
        let amount = wei_to_ether(value);
        let mut info = TransactionInfo {
            amount,
            confirmations: 0,
            blockhash: None,
            blocktime: None,
            trusted: None,
            walletconflicts: Vec::new(),
            txid: transaction["hash"].as_str().unwrap_or(txid).to_string(),
            time: None,
            timereceived: None,
            details: Vec::new(),
            hex: transaction["input"].as_str().unwrap_or("0x").to_string(),
        };

        let block_hash = transaction["blockHash"].as_str().map(str::to_string);
        if let Some(hash) = &block_hash {
            let block = self.block_by_hash(hash).await?;
            let time = parse_u64_quantity(&block["timestamp"])?;
            info.confirmations = self.confirmations(&block).await?;
            info.blockhash = Some(hash.clone());
            info.blocktime = Some(time);
            info.time = Some(time);
        }

        let is_local = |address: &str| accounts.iter().any(|a| a.eq_ignore_ascii_case(address));

        if let Some(to) = transaction["to"].as_str().filter(|to| is_local(*to)) {
            info.details.push(TransactionDetail::Receive(ReceiveDetail {
                account: String::new(),
                address: to.to_string(),
                category: "receive".to_string(),
                amount,
                label: String::new(),
                vout: 1,
            }));
        }

        if let Some(from) = transaction["from"].as_str().filter(|from| is_local(*from)) {
            let fee = match block_hash {
                Some(_) => {
                    let receipt = self
                        .call("eth_getTransactionReceipt", vec![json!(txid)])
                        .await?;
                    if receipt.is_null() {
                        None
                    } else {
                        let gas_price = parse_quantity(&transaction["gasPrice"])?;
                        let gas_used = parse_quantity(&receipt["gasUsed"])?;
                        Some(wei_to_ether(gas_price.saturating_mul(gas_used)))
                    }
                }
                None => None,
            };
            info.details.push(TransactionDetail::Send(SendDetail {
                account: String::new(),
                address: from.to_string(),
                category: "send".to_string(),
                amount: -amount,
                vout: 1,
                fee,
                abandoned: false,
            }));
        }

        Ok(info)
    }

    pub async fn getwalletinfo(&self) -> Result<WalletInfo, EthdError> {
        let accounts = self.accounts().await?;
        let total: Wei = self.balances(&accounts).await?.into_iter().sum();
        Ok(WalletInfo {
            walletname: String::new(),
            walletversion: None,
            balance: total.to_ether(),
            unconfirmed_balance: None,
            immature_balance: None,
            txcount: None,
            keypoololdest: None,
            keypoolsize: None,
            unlocked_until: None,
            paytxfee: self.paytxfee().await.unwrap_or_else(default_fee),
            accountcount: accounts.len(),
        })
    }

    /// The account transfers are sent from: the node's coinbase, or its
    /// first account when no coinbase is configured.
    async fn sending_account(&self) -> Result<String, EthdError> {
        match self.call("eth_coinbase", vec![]).await {
            Ok(Value::String(coinbase)) if !coinbase.is_empty() => return Ok(coinbase),
            Ok(_) => {}
            Err(EthdError::BadResponse { message, .. }) => {
                tracing::debug!("No coinbase ({}), using first account", message);
            }
            Err(e) => return Err(e),
        }
        self.accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EthdError::InvalidParameter("No local account to send from".to_string()))
    }

    /// Send `amount` ether to `address` and return the transaction id.
    ///
    /// `comment`, `comment_to` and `subtractfeefromamount` are accepted for
    /// compatibility and not applied.
    pub async fn sendtoaddress(
        &self,
        address: &str,
        amount: f64,
        _comment: Option<&str>,
        _comment_to: Option<&str>,
        _subtractfeefromamount: bool,
    ) -> Result<String, EthdError> {
        if !is_valid_address(address) {
            return Err(EthdError::InvalidParameter("Invalid address".to_string()));
        }
        if !amount.is_finite() {
            return Err(EthdError::InvalidParameter("Invalid amount".to_string()));
        }
        if amount <= 0.0 {
            return Err(EthdError::AmountOutOfRange("Amount out of range".to_string()));
        }

        let (from, quote) = tokio::try_join!(self.sending_account(), self.gas_quote())?;
        let value = Wei::from_ether(amount);
        let request = json!({
            "from": from,
            "to": address,
            "gas": to_quantity(u128::from(quote.gas_amount)),
            "gasPrice": to_quantity(quote.gas_price),
            "value": value.to_quantity(),
        });
        tracing::info!("Sending {} from {} to {}", value, from, address);

        let txid = self.call("eth_sendTransaction", vec![request]).await?;
        txid.as_str().map(str::to_string).ok_or_else(|| {
            EthdError::bad_response(-1, format!("node returned no transaction id: {}", txid))
        })
    }

    /// Set the fee used for subsequent transfers. Fails with -3 when
    /// `amount` is not positive.
    pub async fn settxfee(&self, amount: f64) -> Result<bool, EthdError> {
        if amount <= 0.0 {
            return Err(EthdError::AmountOutOfRange("Amount out of range".to_string()));
        }
        self.set_paytxfee(amount).await;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_getbalance(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let account = params.opt_string(0, "account")?;
        let minconf = params.u64_or(1, "minconf", 1)?;
        let watchonly = params.bool_or(2, "include_watchonly", true)?;
        to_json(proxy.getbalance(account.as_deref(), minconf, watchonly).await?)
    })
}

fn handle_gettransaction(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let txid = params.string(0, "txid")?;
        let watchonly = params.bool_or(1, "include_watchonly", false)?;
        to_json(proxy.gettransaction(&txid, watchonly).await?)
    })
}

fn handle_getwalletinfo(proxy: &EthereumProxy, _params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move { to_json(proxy.getwalletinfo().await?) })
}

fn handle_listaccounts(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let minconf = params.u64_or(0, "minconf", 1)?;
        let watchonly = params.bool_or(1, "include_watchonly", true)?;
        to_json(proxy.listaccounts(minconf, watchonly).await?)
    })
}

fn handle_sendtoaddress(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let address = params.string(0, "address")?;
        let amount = params
            .f64(1)
            .ok_or_else(|| EthdError::InvalidParameter("Invalid amount".to_string()))?;
        let comment = params.opt_string(2, "comment")?;
        let comment_to = params.opt_string(3, "comment_to")?;
        let subtract = params.bool_or(4, "subtractfeefromamount", false)?;
        to_json(
            proxy
                .sendtoaddress(&address, amount, comment.as_deref(), comment_to.as_deref(), subtract)
                .await?,
        )
    })
}

fn handle_settxfee(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        // Unparseable amounts answer false rather than raising
        match params.f64(0) {
            Some(amount) => to_json(proxy.settxfee(amount).await?),
            None => Ok(Value::Bool(false)),
        }
    })
}

pub(crate) static METHODS: &[MethodSpec] = &[
    MethodSpec {
        name: "getbalance",
        category: Category::Wallet,
        summary: "getbalance ( \"account\" minconf include_watchonly )",
        doc: "getbalance ( \"account\" minconf include_watchonly )\n\
              \n\
              Returns the total balance of all local accounts, in ether.\n\
              minconf and include_watchonly are accepted but not applied.\n\
              \n\
              Arguments:\n\
              1. \"account\"          (string, optional) Ignored, kept for compatibility\n\
              2. minconf              (numeric, optional, default=1) Not applied\n\
              3. include_watchonly    (bool, optional, default=true) Not applied\n\
              \n\
              Result:\n\
              amount              (numeric) The total amount in ETH received for this wallet.\n\
              \n\
              Examples:\n\
              > ethereum-cli getbalance",
        min_params: 0,
        max_params: 3,
        handler: handle_getbalance,
    },
    MethodSpec {
        name: "gettransaction",
        category: Category::Wallet,
        summary: "gettransaction \"txid\" ( include_watchonly )",
        doc: "gettransaction \"txid\" ( include_watchonly )\n\
              \n\
              Get detailed information about in-wallet transaction <txid>\n\
              \n\
              Arguments:\n\
              1. \"txid\"                  (string, required) The transaction id\n\
              2. \"include_watchonly\"     (bool, optional, default=false) Not applied\n\
              \n\
              Result:\n\
              {\n\
                \"amount\" : x.xxx,        (numeric) The transaction amount in ETH\n\
                \"confirmations\" : n,     (numeric) The number of confirmations\n\
                \"blockhash\" : \"hash\",  (string) The block hash\n\
                \"blocktime\" : ttt,       (numeric) The time in seconds since epoch\n\
                \"txid\" : \"transactionid\",\n\
                \"details\" : [\n\
                  {\n\
                    \"address\" : \"address\",\n\
                    \"category\" : \"send|receive\",\n\
                    \"amount\" : x.xxx,    (numeric) negative for send\n\
                    \"fee\": x.xxx,        (numeric) send only, once mined\n\
                    \"vout\" : n\n\
                  }\n\
                ],\n\
                \"hex\" : \"data\"         (string) Transaction input data\n\
              }\n\
              \n\
              Examples:\n\
              > ethereum-cli gettransaction \"0x1075db55d416d3ca199f55b6084e2115b9345e16c5cf302fc80e9d5fbf5d48d\"",
        min_params: 1,
        max_params: 2,
        handler: handle_gettransaction,
    },
    MethodSpec {
        name: "getwalletinfo",
        category: Category::Wallet,
        summary: "getwalletinfo",
        doc: "getwalletinfo\n\
              Returns an object containing various wallet state info.\n\
              Fields with no Ethereum equivalent are null.\n\
              \n\
              Result:\n\
              {\n\
                \"walletname\": xxxxx,     (string) the wallet name\n\
                \"balance\": xxxxxxx,      (numeric) the total balance of the wallet in ETH\n\
                \"paytxfee\": x.xxxx,      (numeric) the transaction fee configuration, set in ETH\n\
                \"accountcount\": n        (numeric) number of node accounts\n\
              }\n\
              \n\
              Examples:\n\
              > ethereum-cli getwalletinfo",
        min_params: 0,
        max_params: 0,
        handler: handle_getwalletinfo,
    },
    MethodSpec {
        name: "listaccounts",
        category: Category::Wallet,
        summary: "listaccounts ( minconf include_watchonly)",
        doc: "listaccounts ( minconf include_watchonly)\n\
              \n\
              Returns Object that has account names as keys, account balances as values.\n\
              \n\
              Arguments:\n\
              1. minconf             (numeric, optional, default=1) Not applied\n\
              2. include_watchonly   (bool, optional, default=true) Not applied\n\
              \n\
              Result:\n\
              {                      (json object where keys are account names, and values are numeric balances\n\
                \"Account #0\": x.xxx,  (numeric) The property name is the account name, and the value is the total balance for the account.\n\
                ...\n\
              }\n\
              \n\
              Examples:\n\
              > ethereum-cli listaccounts",
        min_params: 0,
        max_params: 2,
        handler: handle_listaccounts,
    },
    MethodSpec {
        name: "sendtoaddress",
        category: Category::Wallet,
        summary: "sendtoaddress \"address\" amount ( \"comment\" \"comment_to\" subtractfeefromamount )",
        doc: "sendtoaddress \"address\" amount ( \"comment\" \"comment_to\" subtractfeefromamount )\n\
              \n\
              Send an amount to a given address from the node's coinbase account.\n\
              comment, comment_to and subtractfeefromamount are accepted but not applied.\n\
              \n\
              Arguments:\n\
              1. \"address\"            (string, required) The Ethereum address to send to.\n\
              2. \"amount\"             (numeric or string, required) The amount in ETH to send. eg 0.1\n\
              3. \"comment\"            (string, optional) Not applied\n\
              4. \"comment_to\"         (string, optional) Not applied\n\
              5. subtractfeefromamount  (boolean, optional, default=false) Not applied\n\
              \n\
              Result:\n\
              \"txid\"                  (string) The transaction id.\n\
              \n\
              Examples:\n\
              > ethereum-cli sendtoaddress \"0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c\" 0.1",
        min_params: 2,
        max_params: 5,
        handler: handle_sendtoaddress,
    },
    MethodSpec {
        name: "settxfee",
        category: Category::Wallet,
        summary: "settxfee amount",
        doc: "settxfee amount\n\
              \n\
              Set the transaction fee per transfer. Overwrites the paytxfee parameter.\n\
              \n\
              Arguments:\n\
              1. amount         (numeric or string, required) The transaction fee in ETH\n\
              \n\
              Result:\n\
              true|false        (boolean) Returns true if successful\n\
              \n\
              Examples:\n\
              > ethereum-cli settxfee 0.00042",
        min_params: 1,
        max_params: 1,
        handler: handle_settxfee,
    },
];
