// src/blockchain/transaction.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::{
    keys::{KeyMaterial, PublicKey},
    models::*,
};

/// Payer account plus valid-start timestamp; unique per transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start: DateTime<Utc>,
}

impl TransactionId {
    pub fn generate(account_id: AccountId) -> Self {
        Self {
            account_id,
            valid_start: Utc::now(),
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id,
            self.valid_start.timestamp(),
            self.valid_start.timestamp_subsec_nanos()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum TransactionBody {
    TokenCreate(CreateTokenParams),
    TokenMint(MintFungibleTokenParams),
    NftMint(MintNonFungibleTokenParams),
    CryptoTransfer(TransferHbarParams),
    TokenAirdrop(AirdropFungibleTokenParams),
    AccountCreate(CreateAccountParams),
    AccountUpdate(UpdateAccountParams),
    AccountDelete(DeleteAccountParams),
    TopicCreate(CreateTopicParams),
    TopicMessageSubmit(SubmitTopicMessageParams),
    ContractExecute(ContractExecuteParams),
}

impl TransactionBody {
    pub fn name(&self) -> &'static str {
        match self {
            TransactionBody::TokenCreate(_) => "TokenCreateTransaction",
            TransactionBody::TokenMint(_) | TransactionBody::NftMint(_) => "TokenMintTransaction",
            TransactionBody::CryptoTransfer(_) => "TransferTransaction",
            TransactionBody::TokenAirdrop(_) => "TokenAirdropTransaction",
            TransactionBody::AccountCreate(_) => "AccountCreateTransaction",
            TransactionBody::AccountUpdate(_) => "AccountUpdateTransaction",
            TransactionBody::AccountDelete(_) => "AccountDeleteTransaction",
            TransactionBody::TopicCreate(_) => "TopicCreateTransaction",
            TransactionBody::TopicMessageSubmit(_) => "TopicMessageSubmitTransaction",
            TransactionBody::ContractExecute(_) => "ContractExecuteTransaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePair {
    pub public_key: PublicKey,
    #[serde(with = "crate::utils::hex_bytes")]
    pub signature: Vec<u8>,
}

/// The signed part of a transaction. Serialized once at freeze time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignableBody {
    transaction_id: TransactionId,
    node_account_ids: Vec<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
    body: TransactionBody,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(with = "crate::utils::base64_bytes")]
    body_bytes: Vec<u8>,
    #[serde(default)]
    sig_map: Vec<SignaturePair>,
}

#[derive(Debug, Clone)]
struct Frozen {
    transaction_id: TransactionId,
    node_account_ids: Vec<AccountId>,
    body_bytes: Vec<u8>,
}

/// A fully parameterized ledger transaction moving through freeze → sign → submit.
///
/// Parameters are immutable once frozen: the body bytes are fixed at that point
/// and every signature is made over exactly those bytes.
#[derive(Debug, Clone)]
pub struct Transaction {
    body: TransactionBody,
    memo: Option<String>,
    frozen: Option<Frozen>,
    signatures: Vec<SignaturePair>,
}

impl Transaction {
    pub fn new(body: TransactionBody) -> Self {
        Self {
            body,
            memo: None,
            frozen: None,
            signatures: Vec::new(),
        }
    }

    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo.filter(|m| !m.is_empty());
        self
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.frozen.as_ref().map(|f| &f.transaction_id)
    }

    pub fn node_account_ids(&self) -> &[AccountId] {
        self.frozen
            .as_ref()
            .map(|f| f.node_account_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn freeze(
        &mut self,
        transaction_id: TransactionId,
        node_account_ids: Vec<AccountId>,
    ) -> LedgerResult<()> {
        if self.is_frozen() {
            return Err(LedgerError::validation("Transaction is already frozen"));
        }
        if node_account_ids.is_empty() {
            return Err(LedgerError::validation(
                "Cannot freeze a transaction without node account ids",
            ));
        }
        let signable = SignableBody {
            transaction_id,
            node_account_ids,
            memo: self.memo.clone(),
            body: self.body.clone(),
        };
        let body_bytes = serde_json::to_vec(&signable)
            .map_err(|e| LedgerError::Validation(format!("Failed to serialize transaction body: {}", e)))?;
        self.frozen = Some(Frozen {
            transaction_id: signable.transaction_id,
            node_account_ids: signable.node_account_ids,
            body_bytes,
        });
        Ok(())
    }

    pub fn body_bytes(&self) -> LedgerResult<&[u8]> {
        self.frozen
            .as_ref()
            .map(|f| f.body_bytes.as_slice())
            .ok_or_else(|| LedgerError::validation("Transaction must be frozen first"))
    }

    /// Signs the frozen body. Signing twice with the same key is a no-op.
    pub fn sign(&mut self, key: &KeyMaterial) -> LedgerResult<()> {
        if self
            .signatures
            .iter()
            .any(|pair| &pair.public_key == key.public_key())
        {
            return Ok(());
        }
        let signature = key.sign(self.body_bytes()?)?;
        self.signatures.push(SignaturePair {
            public_key: key.public_key().clone(),
            signature,
        });
        Ok(())
    }

    /// Attaches a signature produced elsewhere, e.g. by an external wallet.
    pub fn add_signature(&mut self, public_key: PublicKey, signature: Vec<u8>) -> LedgerResult<()> {
        if !public_key.verify(self.body_bytes()?, &signature) {
            return Err(LedgerError::Validation(format!(
                "Signature does not match the transaction body for key {}",
                public_key
            )));
        }
        self.signatures.retain(|pair| pair.public_key != public_key);
        self.signatures.push(SignaturePair { public_key, signature });
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn signatures(&self) -> &[SignaturePair] {
        &self.signatures
    }

    /// Serialized frozen transaction with any signatures collected so far.
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        let envelope = Envelope {
            body_bytes: self.body_bytes()?.to_vec(),
            sig_map: self.signatures.clone(),
        };
        serde_json::to_vec(&envelope)
            .map_err(|e| LedgerError::Validation(format!("Failed to serialize transaction: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        let invalid = |e: serde_json::Error| LedgerError::Validation(format!("Invalid transaction bytes: {}", e));
        let envelope: Envelope = serde_json::from_slice(bytes).map_err(invalid)?;
        let signable: SignableBody = serde_json::from_slice(&envelope.body_bytes).map_err(invalid)?;
        let mut transaction = Self {
            body: signable.body,
            memo: signable.memo,
            frozen: Some(Frozen {
                transaction_id: signable.transaction_id,
                node_account_ids: signable.node_account_ids,
                body_bytes: envelope.body_bytes,
            }),
            signatures: Vec::new(),
        };
        for pair in envelope.sig_map {
            transaction.add_signature(pair.public_key, pair.signature)?;
        }
        Ok(transaction)
    }
}

/// Maps normalised parameters onto transaction bodies.
pub struct TransactionBuilder;

impl TransactionBuilder {
    pub fn create_token(params: CreateTokenParams) -> Transaction {
        Transaction::new(TransactionBody::TokenCreate(params))
    }

    pub fn mint_fungible_token(params: MintFungibleTokenParams) -> Transaction {
        Transaction::new(TransactionBody::TokenMint(params))
    }

    pub fn mint_non_fungible_token(params: MintNonFungibleTokenParams) -> Transaction {
        Transaction::new(TransactionBody::NftMint(params))
    }

    pub fn transfer_hbar(params: TransferHbarParams) -> Transaction {
        let memo = params.transaction_memo.clone();
        Transaction::new(TransactionBody::CryptoTransfer(params)).with_memo(memo)
    }

    pub fn airdrop_fungible_token(params: AirdropFungibleTokenParams) -> Transaction {
        let memo = params.transaction_memo.clone();
        Transaction::new(TransactionBody::TokenAirdrop(params)).with_memo(memo)
    }

    pub fn create_account(params: CreateAccountParams) -> Transaction {
        Transaction::new(TransactionBody::AccountCreate(params))
    }

    pub fn update_account(params: UpdateAccountParams) -> Transaction {
        Transaction::new(TransactionBody::AccountUpdate(params))
    }

    pub fn delete_account(params: DeleteAccountParams) -> Transaction {
        Transaction::new(TransactionBody::AccountDelete(params))
    }

    pub fn create_topic(params: CreateTopicParams) -> Transaction {
        let memo = params.transaction_memo.clone();
        Transaction::new(TransactionBody::TopicCreate(params)).with_memo(memo)
    }

    pub fn submit_topic_message(params: SubmitTopicMessageParams) -> Transaction {
        let memo = params.transaction_memo.clone();
        Transaction::new(TransactionBody::TopicMessageSubmit(params)).with_memo(memo)
    }

    pub fn execute_contract(params: ContractExecuteParams) -> Transaction {
        Transaction::new(TransactionBody::ContractExecute(params))
    }
}
