#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hedera_mcp_server::{
    blockchain::{
        client::{LedgerClient, Operator},
        keys::{KeyMaterial, PublicKey},
        mirror_node::{AccountInfo, MirrorNode, TokenInfo},
        models::*,
        services::evm::EvmFactories,
        transaction::{Transaction, TransactionId},
    },
    config::Config,
    AppState,
};

pub const OPERATOR: AccountId = AccountId::new(0, 0, 2);
pub const CONTEXT: AccountId = AccountId::new(0, 0, 1001);

pub const ECDSA_KEY: &str = "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";
pub const ECDSA_EVM_ADDRESS: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";

/// In-memory mirror node keyed by account id and EVM address.
#[derive(Default)]
pub struct MockMirrorNode {
    accounts: Mutex<Vec<AccountInfo>>,
    tokens: Mutex<HashMap<String, TokenInfo>>,
    pub account_lookups: AtomicUsize,
}

impl MockMirrorNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account_id: &str, key_type: &str, public_key: Option<&PublicKey>, evm: Option<&str>) -> Self {
        self.accounts.lock().unwrap().push(AccountInfo {
            account_id: account_id.to_string(),
            evm_address: evm.map(str::to_string),
            account_public_key: public_key.map(|k| k.to_string_der()),
            key_type: Some(key_type.to_string()),
            balance: Some(0),
        });
        self
    }

    pub fn with_token(self, token_id: &str, decimals: u32) -> Self {
        self.tokens.lock().unwrap().insert(
            token_id.to_string(),
            TokenInfo {
                token_id: token_id.to_string(),
                name: "Mock".to_string(),
                symbol: "MCK".to_string(),
                decimals,
                ..TokenInfo::default()
            },
        );
        self
    }

    pub fn lookups(&self) -> usize {
        self.account_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MirrorNode for MockMirrorNode {
    async fn get_account(&self, account: &str) -> LedgerResult<AccountInfo> {
        self.account_lookups.fetch_add(1, Ordering::SeqCst);
        let needle = account.to_lowercase();
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.account_id == account || a.evm_address.as_deref() == Some(needle.as_str()))
            .cloned()
            .ok_or_else(|| LedgerError::Resolution(format!("Account {} not found on mirror node", account)))
    }

    async fn get_token_info(&self, token_id: &str) -> LedgerResult<TokenInfo> {
        self.tokens
            .lock()
            .unwrap()
            .get(token_id)
            .cloned()
            .ok_or_else(|| LedgerError::Resolution(format!("Token {} not found on mirror node", token_id)))
    }
}

/// Ledger client that counts every protocol step and never touches a network.
pub struct MockLedgerClient {
    operator: Option<Operator>,
    receipt_status: Mutex<String>,
    pub freezes: AtomicUsize,
    pub signs: AtomicUsize,
    pub submits: AtomicUsize,
    pub receipts: AtomicUsize,
    pub submitted: Mutex<Vec<Transaction>>,
}

impl MockLedgerClient {
    pub fn new(operator: Option<Operator>) -> Self {
        Self {
            operator,
            receipt_status: Mutex::new("SUCCESS".to_string()),
            freezes: AtomicUsize::new(0),
            signs: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            receipts: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_operator() -> Self {
        Self::new(Some(operator()))
    }

    pub fn without_operator() -> Self {
        Self::new(None)
    }

    pub fn fail_receipts_with(&self, status: &str) {
        *self.receipt_status.lock().unwrap() = status.to_string();
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.freezes.load(Ordering::SeqCst),
            self.signs.load(Ordering::SeqCst),
            self.submits.load(Ordering::SeqCst),
            self.receipts.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    fn network(&self) -> Network {
        Network::Testnet
    }

    fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    fn freeze(&self, tx: &mut Transaction, payer: AccountId) -> LedgerResult<()> {
        self.freezes.fetch_add(1, Ordering::SeqCst);
        tx.freeze(TransactionId::generate(payer), self.node_account_ids())
    }

    fn sign_with_operator(&self, tx: &mut Transaction) -> LedgerResult<()> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        let operator = self
            .operator
            .as_ref()
            .ok_or_else(|| LedgerError::resolution("no operator"))?;
        tx.sign(&operator.key)
    }

    async fn submit(&self, tx: &Transaction) -> LedgerResult<TransactionResponse> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(tx.clone());
        Ok(TransactionResponse {
            transaction_id: tx.transaction_id().map(|id| id.to_string()).unwrap_or_default(),
            node_id: Some(AccountId::new(0, 0, 3)),
        })
    }

    async fn get_receipt(&self, response: &TransactionResponse) -> LedgerResult<TransactionReceipt> {
        self.receipts.fetch_add(1, Ordering::SeqCst);
        let status = self.receipt_status.lock().unwrap().clone();
        if status != "SUCCESS" {
            return Err(LedgerError::Protocol {
                status,
                transaction_id: Some(response.transaction_id.clone()),
            });
        }
        Ok(TransactionReceipt {
            status,
            transaction_id: response.transaction_id.clone(),
            token_id: Some(TokenId::new(0, 0, 9001)),
            ..TransactionReceipt::default()
        })
    }
}

pub fn operator_key() -> KeyMaterial {
    KeyMaterial::parse(KeyAlgorithm::EcdsaSecp256k1, ECDSA_KEY).unwrap()
}

pub fn operator() -> Operator {
    Operator::new(OPERATOR, operator_key())
}

pub fn context(mode: ExecutionMode, account: Option<AccountId>) -> ExecutionContext {
    ExecutionContext::new(mode, account)
}

pub fn app_state(
    client: Arc<MockLedgerClient>,
    mirror: Arc<MockMirrorNode>,
    context: ExecutionContext,
) -> AppState {
    AppState {
        config: Arc::new(Config::default()),
        client,
        mirror,
        context,
        factories: EvmFactories::for_network(Network::Testnet),
    }
}
