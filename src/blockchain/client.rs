//! Ledger client for Hedera networks.
//!
//! The client knows its network, an optional operator identity, and how to hand a
//! frozen, signed transaction to the submission relay that talks gRPC to the
//! consensus nodes. Everything above this layer works against the [`LedgerClient`]
//! trait so tests can count calls instead of touching a network.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::blockchain::{
    keys::{KeyMaterial, PublicKey},
    models::*,
    transaction::{Transaction, TransactionId},
};

/// The account paying for and signing autonomous transactions.
#[derive(Debug, Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub key: Arc<KeyMaterial>,
}

impl Operator {
    pub fn new(account_id: AccountId, key: KeyMaterial) -> Self {
        Self {
            account_id,
            key: Arc::new(key),
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn network(&self) -> Network;

    fn operator(&self) -> Option<&Operator>;

    fn operator_account_id(&self) -> Option<AccountId> {
        self.operator().map(|op| op.account_id)
    }

    fn operator_public_key(&self) -> Option<PublicKey> {
        self.operator().map(|op| op.key.public_key().clone())
    }

    fn node_account_ids(&self) -> Vec<AccountId> {
        self.network().node_account_ids()
    }

    /// Assigns a fresh transaction id paid by `payer` and fixes the body bytes.
    fn freeze(&self, tx: &mut Transaction, payer: AccountId) -> LedgerResult<()> {
        tx.freeze(TransactionId::generate(payer), self.node_account_ids())
    }

    fn sign_with_operator(&self, tx: &mut Transaction) -> LedgerResult<()> {
        let operator = self
            .operator()
            .ok_or_else(|| LedgerError::resolution("Client has no operator key to sign with"))?;
        tx.sign(&operator.key)
    }

    async fn submit(&self, tx: &Transaction) -> LedgerResult<TransactionResponse>;

    /// Waits for consensus. A status other than `SUCCESS` is a [`LedgerError::Protocol`].
    async fn get_receipt(&self, response: &TransactionResponse) -> LedgerResult<TransactionReceipt>;
}

/// Relay-backed client used in production.
#[derive(Debug, Clone)]
pub struct Client {
    network: Network,
    operator: Option<Operator>,
    relay_url: Option<String>,
    http: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitReply {
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    node_id: Option<AccountId>,
    #[serde(default)]
    error: Option<String>,
}

impl Client {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            operator: None,
            relay_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_relay(mut self, relay_url: &str) -> LedgerResult<Self> {
        let parsed = Url::parse(relay_url)
            .map_err(|e| LedgerError::Validation(format!("Invalid relay URL '{}': {}", relay_url, e)))?;
        self.relay_url = Some(parsed.as_str().trim_end_matches('/').to_string());
        Ok(self)
    }

    pub fn set_operator(&mut self, account_id: AccountId, key: KeyMaterial) {
        self.operator = Some(Operator::new(account_id, key));
    }

    pub fn with_operator(mut self, account_id: AccountId, key: KeyMaterial) -> Self {
        self.set_operator(account_id, key);
        self
    }

    fn relay(&self) -> LedgerResult<&str> {
        self.relay_url
            .as_deref()
            .ok_or_else(|| LedgerError::resolution("No submission relay configured for this client"))
    }
}

#[async_trait]
impl LedgerClient for Client {
    fn network(&self) -> Network {
        self.network
    }

    fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    async fn submit(&self, tx: &Transaction) -> LedgerResult<TransactionResponse> {
        let url = format!("{}/transactions", self.relay()?);
        let bytes = tx.to_bytes()?;
        info!(
            "Submitting {} to {} ({} signature(s))",
            tx.body().name(),
            self.network,
            tx.signatures().len()
        );

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "transaction": general_purpose::STANDARD.encode(bytes) }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| LedgerError::Network(format!("failed to read relay response: {}", e)))?;
        if !status.is_success() {
            return Err(LedgerError::Network(format!(
                "relay rejected submission: status={} body={}",
                status, body
            )));
        }

        let reply: SubmitReply = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Network(format!("invalid relay response: {}", e)))?;
        if let Some(status) = reply.error {
            return Err(LedgerError::Protocol {
                status,
                transaction_id: reply.transaction_id,
            });
        }

        let transaction_id = reply
            .transaction_id
            .or_else(|| tx.transaction_id().map(|id| id.to_string()))
            .ok_or_else(|| LedgerError::Network("relay response is missing a transaction id".to_string()))?;
        Ok(TransactionResponse {
            transaction_id,
            node_id: reply.node_id,
        })
    }

    async fn get_receipt(&self, response: &TransactionResponse) -> LedgerResult<TransactionReceipt> {
        let url = format!("{}/receipts/{}", self.relay()?, response.transaction_id);
        debug!("Fetching receipt for {}", response.transaction_id);

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Network(format!(
                "receipt query failed: status={} body={}",
                status, body
            )));
        }

        let mut receipt: TransactionReceipt = resp
            .json()
            .await
            .map_err(|e| LedgerError::Network(format!("invalid receipt: {}", e)))?;
        if receipt.transaction_id.is_empty() {
            receipt.transaction_id = response.transaction_id.clone();
        }
        if receipt.status != "SUCCESS" {
            return Err(LedgerError::Protocol {
                status: receipt.status,
                transaction_id: Some(receipt.transaction_id),
            });
        }
        info!("Transaction {} reached consensus", receipt.transaction_id);
        Ok(receipt)
    }
}
