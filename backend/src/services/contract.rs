//! Contract invocation.
//!
//! The contract ABI is embedded and passed through untouched; encoding and
//! signing happen on the other side of the [`ContractInvoker`] seam. The
//! production [`WalletBridge`] posts the call to a signer service that holds
//! the connected wallet and reports failures as `{code, message}`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ContractError, ContractResult};
use crate::models::TxReceipt;

/// ABI of the Block News Media NFT contract.
pub static MINT_ABI: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../abi/block_news_media.json"))
        .expect("Invalid embedded ABI")
});

/// Name of the payable mint function.
pub const MINT_FUNCTION: &str = "createItem";

/// A contract function call with the value to send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub abi: Value,
    pub contract_address: String,
    pub function_name: String,
    pub params: Value,
    /// Wei, as a decimal string.
    pub msg_value: String,
}

/// Build the `createItem(uriOfToken)` call for a metadata URI.
pub fn create_item_call(contract_address: &str, token_uri: &str, value_wei: u128) -> ContractCall {
    ContractCall {
        abi: (*MINT_ABI).clone(),
        contract_address: contract_address.to_string(),
        function_name: MINT_FUNCTION.to_string(),
        params: json!({ "uriOfToken": token_uri }),
        msg_value: value_wei.to_string(),
    }
}

/// Submits contract calls on behalf of the connected wallet.
#[async_trait]
pub trait ContractInvoker: Send + Sync {
    async fn execute(&self, call: &ContractCall) -> ContractResult<TxReceipt>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeResponse {
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    error: Option<BridgeError>,
}

#[derive(Debug, Deserialize)]
struct BridgeError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// HTTP client for a wallet signer service.
#[derive(Clone)]
pub struct WalletBridge {
    client: reqwest::Client,
    url: String,
}

impl WalletBridge {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ContractInvoker for WalletBridge {
    async fn execute(&self, call: &ContractCall) -> ContractResult<TxReceipt> {
        log::info!(
            "executing {} on {} (value {} wei)",
            call.function_name,
            call.contract_address,
            call.msg_value
        );

        let response = self
            .client
            .post(&self.url)
            .json(call)
            .send()
            .await
            .map_err(|e| ContractError::transport(format!("wallet bridge unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ContractError::transport(e.to_string()))?;

        parse_bridge_response(status.as_u16(), &body)
    }
}

/// Map a bridge reply to a receipt or a coded error.
fn parse_bridge_response(status: u16, body: &str) -> ContractResult<TxReceipt> {
    let parsed: Option<BridgeResponse> = serde_json::from_str(body).ok();

    if let Some(err) = parsed.as_ref().and_then(|r| r.error.as_ref()) {
        return Err(ContractError::new(err.code, err.message.clone()));
    }

    if !(200..300).contains(&status) {
        return Err(ContractError::transport(format!("HTTP {}: {}", status, body)));
    }

    match parsed.and_then(|r| r.tx_hash) {
        Some(tx_hash) if !tx_hash.is_empty() => Ok(TxReceipt { tx_hash }),
        _ => Err(ContractError::transport(format!(
            "wallet bridge returned no transaction hash: {}",
            body
        ))),
    }
}
