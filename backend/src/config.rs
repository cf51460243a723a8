//! Service configuration.
//!
//! Everything is read once at process start from the environment (a `.env`
//! file is loaded first when present). The resulting [`MintConfig`] is used to
//! build the collaborator clients, which are then shared for the lifetime of
//! the process.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::mint::UploadFailurePolicy;

/// Contract the mint call is sent to when none is configured.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x7dE3085b3190B3a787822Ee16F23be010f5F8686";

/// 0.01 ETH in wei.
pub const DEFAULT_MINT_PRICE_WEI: u128 = 10_000_000_000_000_000;

const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001";
const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io";
const DEFAULT_WALLET_BRIDGE_URL: &str = "http://127.0.0.1:8545/execute";
const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;

/// Runtime configuration for the mint service.
#[derive(Debug, Clone)]
pub struct MintConfig {
    /// IPFS HTTP API base URL (the `/api/v0/add` host).
    pub ipfs_api_url: String,
    /// Public gateway used to build returned asset URIs.
    pub ipfs_gateway: String,
    /// Parse-compatible feed backend.
    pub parse_server_url: String,
    pub parse_app_id: String,
    pub parse_master_key: Option<String>,
    /// Signer service that executes contract calls for the connected wallet.
    pub wallet_bridge_url: String,
    pub contract_address: String,
    pub mint_price_wei: u128,
    /// Upper bound for each upload and for the transaction.
    pub step_timeout: Duration,
    pub upload_policy: UploadFailurePolicy,
}

impl MintConfig {
    /// Load from process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an explicit map of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mint_price_wei = match get("NFM_MINT_PRICE_WEI") {
            Some(v) => v.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "NFM_MINT_PRICE_WEI",
                message: format!("{}", e),
            })?,
            None => DEFAULT_MINT_PRICE_WEI,
        };

        let timeout_secs = match get("NFM_STEP_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "NFM_STEP_TIMEOUT_SECS",
                message: format!("{}", e),
            })?,
            None => DEFAULT_STEP_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "NFM_STEP_TIMEOUT_SECS",
                message: "must be greater than zero".to_string(),
            });
        }

        let upload_policy = match get("NFM_STRICT_UPLOADS").as_deref().map(str::trim) {
            None | Some("0") | Some("false") | Some("no") => UploadFailurePolicy::Continue,
            Some("1") | Some("true") | Some("yes") => UploadFailurePolicy::Abort,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "NFM_STRICT_UPLOADS",
                    message: format!("expected true/false, got '{}'", other),
                })
            }
        };

        Ok(Self {
            ipfs_api_url: get("NFM_IPFS_API_URL").unwrap_or_else(|| DEFAULT_IPFS_API_URL.to_string()),
            ipfs_gateway: get("NFM_IPFS_GATEWAY").unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string()),
            parse_server_url: required("NFM_PARSE_SERVER_URL")?,
            parse_app_id: required("NFM_PARSE_APP_ID")?,
            parse_master_key: get("NFM_PARSE_MASTER_KEY"),
            wallet_bridge_url: get("NFM_WALLET_BRIDGE_URL")
                .unwrap_or_else(|| DEFAULT_WALLET_BRIDGE_URL.to_string()),
            contract_address: get("NFM_CONTRACT_ADDRESS")
                .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string()),
            mint_price_wei,
            step_timeout: Duration::from_secs(timeout_secs),
            upload_policy,
        })
    }
}
