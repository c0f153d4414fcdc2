// src/blockchain/params.rs
//
// Raw tool parameters as an agent supplies them. Shape checks live here as
// validator attributes; defaulting and lookups belong to the normaliser.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::blockchain::models::{KeyCapability, TokenSupplyType};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFungibleTokenParams {
    #[validate(length(min = 1, max = 100))]
    pub token_name: String,
    #[validate(length(min = 1, max = 100))]
    pub token_symbol: String,
    #[serde(default)]
    #[validate(range(max = 18))]
    pub decimals: Option<u32>,
    /// Whole tokens; scaled by `10^decimals`.
    #[serde(default)]
    pub initial_supply: Option<Decimal>,
    #[serde(default)]
    pub max_supply: Option<Decimal>,
    #[serde(default)]
    pub supply_type: Option<TokenSupplyType>,
    #[serde(default)]
    pub treasury_account_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub token_memo: Option<String>,
    #[serde(default)]
    pub admin_key: KeyCapability,
    #[serde(default)]
    pub supply_key: KeyCapability,
    #[serde(default)]
    pub freeze_key: KeyCapability,
    #[serde(default)]
    pub wipe_key: KeyCapability,
    #[serde(default)]
    pub kyc_key: KeyCapability,
    #[serde(default)]
    pub pause_key: KeyCapability,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNonFungibleTokenParams {
    #[validate(length(min = 1, max = 100))]
    pub token_name: String,
    #[validate(length(min = 1, max = 100))]
    pub token_symbol: String,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_supply: Option<i64>,
    #[serde(default)]
    pub treasury_account_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub token_memo: Option<String>,
    #[serde(default)]
    pub admin_key: KeyCapability,
    /// Always resolved; `Unset` falls back to the caller's default key.
    #[serde(default)]
    pub supply_key: KeyCapability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEntry {
    pub account_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferHbarParams {
    #[validate(length(min = 1))]
    pub transfers: Vec<TransferEntry>,
    #[serde(default)]
    pub source_account_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AirdropFungibleTokenParams {
    #[validate(length(min = 1))]
    pub token_id: String,
    #[serde(default)]
    pub source_account_id: Option<String>,
    #[validate(length(min = 1))]
    pub recipients: Vec<TransferEntry>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MintFungibleTokenParams {
    #[validate(length(min = 1))]
    pub token_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MintNonFungibleTokenParams {
    #[validate(length(min = 1))]
    pub token_id: String,
    #[validate(length(min = 1, max = 10))]
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAccountParams {
    #[serde(default)]
    pub public_key: Option<String>,
    /// HBAR, scaled to tinybars.
    #[serde(default)]
    pub initial_balance: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = -1))]
    pub max_automatic_token_associations: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub account_memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAccountParams {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    #[validate(range(min = -1))]
    pub max_automatic_token_associations: Option<i32>,
    #[serde(default)]
    pub staked_account_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub account_memo: Option<String>,
    #[serde(default)]
    pub decline_staking_reward: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteAccountParams {
    #[validate(length(min = 1))]
    pub account_id: String,
    #[serde(default)]
    pub transfer_account_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTopicParams {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub topic_memo: Option<String>,
    #[serde(default)]
    pub submit_key: KeyCapability,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitTopicMessageParams {
    #[validate(length(min = 1))]
    pub topic_id: String,
    #[validate(length(min = 1))]
    pub message: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub transaction_memo: Option<String>,
}

fn default_erc20_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateErc20Params {
    #[validate(length(min = 1))]
    pub token_name: String,
    #[validate(length(min = 1))]
    pub token_symbol: String,
    #[serde(default = "default_erc20_decimals")]
    #[validate(range(max = 18))]
    pub decimals: u8,
    /// Whole tokens, passed through to the factory unscaled.
    #[serde(default)]
    pub initial_supply: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferErc20Params {
    /// Hedera id or EVM address of the token contract.
    #[validate(length(min = 1))]
    pub contract_id: String,
    #[validate(length(min = 1))]
    pub recipient_address: String,
    /// Base units.
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateErc721Params {
    #[validate(length(min = 1))]
    pub token_name: String,
    #[validate(length(min = 1))]
    pub token_symbol: String,
    #[serde(default)]
    pub base_uri: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MintErc721Params {
    #[validate(length(min = 1))]
    pub contract_id: String,
    #[serde(default)]
    pub to_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferErc721Params {
    #[validate(length(min = 1))]
    pub contract_id: String,
    #[serde(default)]
    pub from_address: Option<String>,
    #[validate(length(min = 1))]
    pub to_address: String,
    pub token_id: u64,
}
