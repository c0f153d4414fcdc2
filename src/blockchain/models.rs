// src/blockchain/models.rs
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::blockchain::keys::PublicKey;

// --- Error types ---

/// A caller-supplied key string could not be parsed under the algorithm the
/// network has recorded for the owning account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to detect key type for account {account_id}: {reason}")]
pub struct KeyDetectionError {
    pub account_id: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Raw shape or invariant violation, raised before anything is built.
    #[error("{0}")]
    Validation(String),
    /// A default account, public key or address mapping could not be determined.
    #[error("{0}")]
    Resolution(String),
    #[error(transparent)]
    KeyDetection(#[from] KeyDetectionError),
    /// Transport-level failure talking to the mirror node or the submission relay.
    #[error("network error: {0}")]
    Network(String),
    /// The network rejected a submitted transaction. Displays the status code verbatim.
    #[error("{status}")]
    Protocol {
        status: String,
        transaction_id: Option<String>,
    },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        LedgerError::Resolution(message.into())
    }

    /// Stable machine-readable name of the error family.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::Resolution(_) => "resolution_error",
            LedgerError::KeyDetection(_) => "key_detection_error",
            LedgerError::Network(_) => "network_error",
            LedgerError::Protocol { .. } => "protocol_error",
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Network(err.to_string())
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(err: validator::ValidationErrors) -> Self {
        LedgerError::Validation(format!("Invalid parameters: {}", err))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// --- Entity identifiers ---

/// A `shard.realm.num` ledger entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

pub type AccountId = EntityId;
pub type TokenId = EntityId;
pub type TopicId = EntityId;
pub type ContractId = EntityId;

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// The long-zero EVM address encoding this id (4 bytes shard, 8 realm, 8 num).
    pub fn to_solidity_address(&self) -> LedgerResult<String> {
        let shard = u32::try_from(self.shard).map_err(|_| {
            LedgerError::Validation(format!("Shard {} does not fit in an EVM address", self.shard))
        })?;
        let mut bytes = Vec::with_capacity(20);
        bytes.extend_from_slice(&shard.to_be_bytes());
        bytes.extend_from_slice(&self.realm.to_be_bytes());
        bytes.extend_from_slice(&self.num.to_be_bytes());
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::Validation(format!("Invalid entity id: '{}'", s));
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let parse = |part: &str| {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };
        Ok(Self {
            shard: parse(parts[0])?,
            realm: parse(parts[1])?,
            num: parse(parts[2])?,
        })
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// --- Key models ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    #[serde(rename = "ED25519")]
    Ed25519,
    #[serde(rename = "ECDSA_SECP256K1")]
    EcdsaSecp256k1,
}

impl KeyAlgorithm {
    /// Maps the mirror node's `key._type` value. Anything else is unsupported.
    pub fn from_mirror_type(key_type: &str) -> Option<Self> {
        match key_type {
            "ED25519" => Some(KeyAlgorithm::Ed25519),
            "ECDSA_SECP256K1" => Some(KeyAlgorithm::EcdsaSecp256k1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::EcdsaSecp256k1 => "ecdsa",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional management key requested for a new token or topic.
///
/// On the wire: `true` asks for the caller's default key, a string is an explicit
/// public key, and `false`, `null` or an absent field leave the capability unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyCapability {
    #[default]
    Unset,
    UseCallerDefaultKey,
    Explicit(String),
}

impl<'de> Deserialize<'de> for KeyCapability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Flag(bool),
            Key(String),
        }

        Ok(match Option::<Wire>::deserialize(deserializer)? {
            None | Some(Wire::Flag(false)) => KeyCapability::Unset,
            Some(Wire::Flag(true)) => KeyCapability::UseCallerDefaultKey,
            Some(Wire::Key(key)) if key.trim().is_empty() => KeyCapability::Unset,
            Some(Wire::Key(key)) => KeyCapability::Explicit(key),
        })
    }
}

// --- Account references ---

/// How a caller referred to an account, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountReference {
    Explicit(AccountId),
    EvmAddress(String),
    ContextDefault,
}

impl AccountReference {
    pub fn parse(raw: Option<&str>) -> LedgerResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(AccountReference::ContextDefault),
            Some(value) if is_evm_address(value) => Ok(AccountReference::EvmAddress(value.to_string())),
            Some(value) => Ok(AccountReference::Explicit(value.parse()?)),
        }
    }
}

/// True for a 0x-prefixed, 20-byte hex string.
pub fn is_evm_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

// --- Network and execution context ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Mainnet,
    Testnet,
    Previewnet,
    LocalNode,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Previewnet => "previewnet",
            Network::LocalNode => "local-node",
        }
    }

    pub fn mirror_node_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://mainnet-public.mirrornode.hedera.com",
            Network::Testnet => "https://testnet.mirrornode.hedera.com",
            Network::Previewnet => "https://previewnet.mirrornode.hedera.com",
            Network::LocalNode => "http://localhost:5551",
        }
    }

    /// Consensus node accounts a frozen transaction is addressed to.
    pub fn node_account_ids(&self) -> Vec<AccountId> {
        match self {
            Network::LocalNode => vec![AccountId::new(0, 0, 3)],
            _ => vec![
                AccountId::new(0, 0, 3),
                AccountId::new(0, 0, 4),
                AccountId::new(0, 0, 5),
            ],
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "previewnet" => Ok(Network::Previewnet),
            "local-node" | "localnode" | "local" => Ok(Network::LocalNode),
            _ => Err(LedgerError::Validation(format!("Unsupported network: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Sign with the operator key and submit immediately.
    #[default]
    Autonomous,
    /// Freeze only and hand back unsigned bytes for an external signer.
    ReturnBytes,
}

impl FromStr for ExecutionMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "autonomous" => Ok(ExecutionMode::Autonomous),
            "return_bytes" | "returnbytes" => Ok(ExecutionMode::ReturnBytes),
            other => Err(LedgerError::Validation(format!("Unsupported execution mode: {}", other))),
        }
    }
}

/// Per-invocation settings supplied by the caller; immutable for the duration of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub mode: ExecutionMode,
    /// Account acting on behalf of the user, preferred over the client operator.
    pub account_id: Option<AccountId>,
}

impl ExecutionContext {
    pub fn new(mode: ExecutionMode, account_id: Option<AccountId>) -> Self {
        Self { mode, account_id }
    }
}

// --- Submission and receipt models ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<AccountId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub status: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<TokenId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<TopicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<ContractId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub serials: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_sequence_number: Option<u64>,
}

/// Machine-facing half of an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawResponse {
    Receipt(TransactionReceipt),
    #[serde(rename_all = "camelCase")]
    Bytes {
        #[serde(with = "crate::utils::base64_bytes")]
        bytes: Vec<u8>,
        transaction_id: String,
    },
    Error {
        error: String,
        kind: String,
    },
}

/// Outcome of a submitted or prepared transaction, readable by code and by an LLM narrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub raw: RawResponse,
    pub human_message: String,
}

impl ExecutionResult {
    pub fn from_error(err: &LedgerError) -> Self {
        Self {
            human_message: format!("Failed to execute transaction: {}", err),
            raw: RawResponse::Error {
                error: err.to_string(),
                kind: err.kind().to_string(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.raw, RawResponse::Error { .. })
    }
}

// --- Normalised parameter models ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSupplyType {
    #[default]
    Finite,
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    FungibleCommon,
    NonFungibleUnique,
}

/// Management keys attached to a new token. Absent keys can never be added later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wipe_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_key: Option<PublicKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTokenParams {
    pub token_name: String,
    pub token_symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_memo: Option<String>,
    pub token_type: TokenType,
    pub supply_type: TokenSupplyType,
    pub decimals: u32,
    pub initial_supply: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_supply: Option<i64>,
    pub treasury_account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_account_id: Option<AccountId>,
    pub keys: TokenKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub account_id: AccountId,
    pub amount: i64,
}

impl Transfer {
    pub fn new(account_id: AccountId, amount: i64) -> Self {
        Self { account_id, amount }
    }
}

/// Ordered account deltas in base units. Always nets to exactly zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferList(Vec<Transfer>);

impl TransferList {
    /// Appends a single debit for `source` equal to the sum of the credits.
    pub fn balanced(credits: Vec<Transfer>, source: AccountId) -> LedgerResult<Self> {
        let mut total: i64 = 0;
        for credit in &credits {
            if credit.amount <= 0 {
                return Err(LedgerError::Validation(format!(
                    "Invalid transfer amount: {}",
                    credit.amount
                )));
            }
            total = total.checked_add(credit.amount).ok_or_else(|| {
                LedgerError::validation("Total transfer amount exceeds the ledger's base-unit range")
            })?;
        }
        let mut entries = credits;
        entries.push(Transfer::new(source, -total));
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[Transfer] {
        &self.0
    }

    pub fn sum(&self) -> i128 {
        self.0.iter().map(|t| t.amount as i128).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHbarParams {
    pub hbar_transfers: TransferList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirdropFungibleTokenParams {
    pub token_id: TokenId,
    pub token_transfers: TransferList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintFungibleTokenParams {
    pub token_id: TokenId,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintNonFungibleTokenParams {
    pub token_id: TokenId,
    pub metadata: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub public_key: PublicKey,
    pub initial_balance: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_automatic_token_associations: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_memo: Option<String>,
}

/// Only fields the caller supplied are present; absent means "leave unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountParams {
    pub account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_automatic_token_associations: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staked_account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decline_staking_reward: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAccountParams {
    pub account_id: AccountId,
    pub transfer_account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTopicParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTopicMessageParams {
    pub topic_id: TopicId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_memo: Option<String>,
}

/// An ABI-encoded EVM call packaged for a contract-execute transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractExecuteParams {
    pub contract_id: ContractId,
    pub gas: u64,
    #[serde(with = "crate::utils::hex_bytes")]
    pub function_parameters: Vec<u8>,
}
