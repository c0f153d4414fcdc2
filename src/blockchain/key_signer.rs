//! Signing handle binding an account, its resolved key and a network client.

use std::sync::Arc;

use tracing::info;

use crate::blockchain::{
    client::{Client, LedgerClient, Operator},
    keys::KeyMaterial,
    mirror_node::{MirrorNode, MirrorNodeClient},
    models::*,
    services::{execution, key_type::detect_key_type},
    transaction::Transaction,
};

/// A key as handed to [`KeySigner::create`]: already parsed, or a string whose
/// algorithm still has to be looked up on the network.
pub enum KeyInput {
    Material(KeyMaterial),
    Encoded(String),
}

impl From<KeyMaterial> for KeyInput {
    fn from(key: KeyMaterial) -> Self {
        KeyInput::Material(key)
    }
}

impl From<&str> for KeyInput {
    fn from(key: &str) -> Self {
        KeyInput::Encoded(key.to_string())
    }
}

impl From<String> for KeyInput {
    fn from(key: String) -> Self {
        KeyInput::Encoded(key)
    }
}

#[derive(Debug, Clone)]
pub struct KeySigner {
    account_id: AccountId,
    network: Network,
    key_type: KeyAlgorithm,
    client: Arc<Client>,
}

impl KeySigner {
    /// Resolves `network_name`, detects the key's algorithm from the mirror node and
    /// binds the client operator to `account_id` plus that key.
    pub async fn create(
        account_id: AccountId,
        key: impl Into<KeyInput>,
        network_name: &str,
        relay_url: Option<&str>,
    ) -> LedgerResult<Self> {
        let network: Network = network_name.parse()?;
        let mirror = MirrorNodeClient::for_network(network);
        Self::create_with(account_id, key, network, &mirror, relay_url).await
    }

    pub async fn create_with(
        account_id: AccountId,
        key: impl Into<KeyInput>,
        network: Network,
        mirror: &dyn MirrorNode,
        relay_url: Option<&str>,
    ) -> LedgerResult<Self> {
        let key = match key.into() {
            KeyInput::Material(key) => key,
            KeyInput::Encoded(encoded) => detect_key_type(mirror, &account_id, &encoded).await?,
        };
        let key_type = key.algorithm();

        let mut client = Client::for_network(network);
        if let Some(url) = relay_url {
            client = client.with_relay(url)?;
        }
        client.set_operator(account_id, key);
        info!("Signer ready for {} on {} ({})", account_id, network, key_type);

        Ok(Self {
            account_id,
            network,
            key_type,
            client: Arc::new(client),
        })
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn key_type(&self) -> KeyAlgorithm {
        self.key_type
    }

    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.client.operator()
    }

    /// Freezes only if not frozen and signs only if unsigned, then submits and
    /// waits for the receipt.
    pub async fn sign_and_execute(&self, tx: &mut Transaction) -> LedgerResult<TransactionReceipt> {
        execution::sign_and_execute(tx, self.client.as_ref(), self.account_id).await
    }
}
