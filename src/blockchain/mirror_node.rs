// src/blockchain/mirror_node.rs

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::blockchain::models::*;

/// Account state as published by the mirror node REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: String,
    pub evm_address: Option<String>,
    /// Hex-encoded key, possibly DER-prefixed.
    pub account_public_key: Option<String>,
    /// `ED25519`, `ECDSA_SECP256K1`, or something this crate does not sign with.
    pub key_type: Option<String>,
    pub balance: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenInfo {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: Option<String>,
    pub max_supply: Option<String>,
    pub supply_type: Option<String>,
    pub treasury_account_id: Option<String>,
}

/// Read-only view of ledger state. Every call is a fresh network read.
#[async_trait]
pub trait MirrorNode: Send + Sync {
    async fn get_account(&self, account: &str) -> LedgerResult<AccountInfo>;

    async fn get_token_info(&self, token_id: &str) -> LedgerResult<TokenInfo>;
}

#[derive(Deserialize)]
struct AccountBody {
    account: String,
    #[serde(default)]
    evm_address: Option<String>,
    #[serde(default)]
    key: Option<KeyBody>,
    #[serde(default)]
    balance: Option<BalanceBody>,
}

#[derive(Deserialize)]
struct KeyBody {
    #[serde(rename = "_type")]
    key_type: String,
    key: String,
}

#[derive(Deserialize)]
struct BalanceBody {
    balance: i64,
}

#[derive(Deserialize)]
struct TokenBody {
    token_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(deserialize_with = "string_or_number")]
    decimals: u32,
    #[serde(default)]
    total_supply: Option<String>,
    #[serde(default)]
    max_supply: Option<String>,
    #[serde(default)]
    supply_type: Option<String>,
    #[serde(default)]
    treasury_account_id: Option<String>,
}

// decimals is published as a string
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    // Value copes with the arbitrary-precision number form; an untagged enum does not
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid decimals: {}", n))),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid decimals: {}", other))),
    }
}

#[derive(Debug, Clone)]
pub struct MirrorNodeClient {
    base_url: String,
    http: reqwest::Client,
}

impl MirrorNodeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn for_network(network: Network) -> Self {
        Self::new(network.mirror_node_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str, what: &str) -> LedgerResult<T> {
        let url = format!("{}/api/v1/{}", self.base_url, path);
        debug!("Mirror node query: {}", url);

        let res = self.http.get(&url).send().await?;
        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::Resolution(format!("{} not found on mirror node", what)));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LedgerError::Network(format!(
                "mirror node error for {}: status={} body={}",
                what, status, body
            )));
        }
        res.json::<T>()
            .await
            .map_err(|e| LedgerError::Network(format!("invalid mirror node response for {}: {}", what, e)))
    }
}

#[async_trait]
impl MirrorNode for MirrorNodeClient {
    async fn get_account(&self, account: &str) -> LedgerResult<AccountInfo> {
        let body: AccountBody = self
            .fetch(&format!("accounts/{}", account), &format!("Account {}", account))
            .await?;
        let (key_type, account_public_key) = match body.key {
            Some(key) => (Some(key.key_type), Some(key.key)),
            None => (None, None),
        };
        Ok(AccountInfo {
            account_id: body.account,
            evm_address: body.evm_address,
            account_public_key,
            key_type,
            balance: body.balance.map(|b| b.balance),
        })
    }

    async fn get_token_info(&self, token_id: &str) -> LedgerResult<TokenInfo> {
        let body: TokenBody = self
            .fetch(&format!("tokens/{}", token_id), &format!("Token {}", token_id))
            .await?;
        Ok(TokenInfo {
            token_id: body.token_id,
            name: body.name,
            symbol: body.symbol,
            decimals: body.decimals,
            total_supply: body.total_supply,
            max_supply: body.max_supply,
            supply_type: body.supply_type,
            treasury_account_id: body.treasury_account_id,
        })
    }
}
