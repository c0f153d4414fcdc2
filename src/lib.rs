// src/lib.rs

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::blockchain::{
    client::{Client, LedgerClient},
    key_signer::KeySigner,
    mirror_node::{MirrorNode, MirrorNodeClient},
    models::ExecutionContext,
    services::evm::EvmFactories,
};

pub mod api;
pub mod blockchain;
pub mod config;
pub mod mcp;
pub mod utils;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::Config>,
    /// Ledger client; carries the operator when credentials are configured
    pub client: Arc<dyn LedgerClient>,
    /// Read-only oracle for account and token facts
    pub mirror: Arc<dyn MirrorNode>,
    /// Per-deployment execution settings handed to every tool call
    pub context: ExecutionContext,
    pub factories: EvmFactories,
}

impl AppState {
    /// Wires the production collaborators from configuration.
    ///
    /// With operator credentials the key type is detected on the mirror node, so
    /// this performs one network read.
    pub async fn from_config(config: config::Config) -> anyhow::Result<Self> {
        let mirror = MirrorNodeClient::new(&config.mirror_node_url);

        let client: Arc<Client> = match (&config.operator_account_id, &config.operator_key) {
            (Some(account_id), Some(key)) => {
                let signer = KeySigner::create_with(
                    *account_id,
                    key.expose_secret().as_str(),
                    config.network,
                    &mirror,
                    config.submission_relay_url.as_deref(),
                )
                .await
                .context("Failed to initialise operator signer")?;
                info!("Operator {} uses a {} key", signer.account_id(), signer.key_type());
                signer.client()
            }
            _ => {
                warn!("No operator configured; autonomous execution will be unavailable");
                let mut client = Client::for_network(config.network);
                if let Some(url) = config.submission_relay_url.as_deref() {
                    client = client.with_relay(url).context("SUBMISSION_RELAY_URL is invalid")?;
                }
                Arc::new(client)
            }
        };

        let context = ExecutionContext::new(config.execution_mode, config.context_account_id);
        let factories = EvmFactories::for_network(config.network)
            .with_overrides(config.erc20_factory, config.erc721_factory);

        Ok(Self {
            config: Arc::new(config),
            client: client as Arc<dyn LedgerClient>,
            mirror: Arc::new(mirror),
            context,
            factories,
        })
    }
}
