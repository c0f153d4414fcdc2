// src/config.rs

use std::env;

use anyhow::{Context, Result};
use secrecy::Secret;

use crate::blockchain::models::{AccountId, ContractId, ExecutionMode, Network};

// All configuration, loaded once at startup from the environment / .env file.
#[derive(Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    // Ledger settings
    pub network: Network,
    pub mirror_node_url: String,
    pub submission_relay_url: Option<String>,

    // Signer settings
    pub operator_account_id: Option<AccountId>,
    /// Never logged; parsed once the account's key type is known.
    pub operator_key: Option<Secret<String>>,

    // Execution settings
    pub execution_mode: ExecutionMode,
    /// Account acting for the user, preferred over the operator for defaults.
    pub context_account_id: Option<AccountId>,

    // EVM factory overrides
    pub erc20_factory: Option<ContractId>,
    pub erc721_factory: Option<ContractId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            network: Network::Testnet,
            mirror_node_url: Network::Testnet.mirror_node_url().to_string(),
            submission_relay_url: None,
            operator_account_id: None,
            operator_key: None,
            execution_mode: ExecutionMode::Autonomous,
            context_account_id: None,
            erc20_factory: None,
            erc721_factory: None,
        }
    }
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} is invalid", name)),
        None => Ok(None),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .context("PORT must be a valid number")?;

        let network: Network = parse_optional(&lookup, "HEDERA_NETWORK")?.unwrap_or(Network::Testnet);

        let mirror_node_url = lookup("MIRROR_NODE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| network.mirror_node_url().to_string());
        url::Url::parse(&mirror_node_url).context("MIRROR_NODE_URL must be a valid URL")?;

        let operator_account_id = parse_optional(&lookup, "OPERATOR_ACCOUNT_ID")?;
        let operator_key = lookup("OPERATOR_KEY")
            .filter(|v| !v.trim().is_empty())
            .map(Secret::new);
        if operator_key.is_some() != operator_account_id.is_some() {
            anyhow::bail!("OPERATOR_ACCOUNT_ID and OPERATOR_KEY must be set together");
        }

        Ok(Config {
            port,
            network,
            mirror_node_url,
            submission_relay_url: lookup("SUBMISSION_RELAY_URL").filter(|v| !v.trim().is_empty()),
            operator_account_id,
            operator_key,
            execution_mode: parse_optional(&lookup, "EXECUTION_MODE")?.unwrap_or_default(),
            context_account_id: parse_optional(&lookup, "CONTEXT_ACCOUNT_ID")?,
            erc20_factory: parse_optional(&lookup, "ERC20_FACTORY_ADDRESS")?,
            erc721_factory: parse_optional(&lookup, "ERC721_FACTORY_ADDRESS")?,
        })
    }
}
