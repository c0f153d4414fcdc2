// src/blockchain/services/account.rs

use tracing::debug;

use crate::blockchain::{
    client::LedgerClient,
    keys::PublicKey,
    mirror_node::MirrorNode,
    models::*,
};

/// The account acting for the user: the context account first, then the client operator.
pub fn get_default_account(context: &ExecutionContext, client: &dyn LedgerClient) -> Option<AccountId> {
    context.account_id.or_else(|| client.operator_account_id())
}

/// Resolves an optional canonical id with precedence explicit > context > operator.
pub fn resolve_account(
    explicit: Option<&str>,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
) -> LedgerResult<AccountId> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id.parse(),
        None => get_default_account(context, client).ok_or_else(|| {
            LedgerError::resolution(
                "Could not determine default account ID: no account in context and no operator on the client",
            )
        }),
    }
}

/// Like [`resolve_account`] but also accepts EVM addresses, looked up on the mirror node.
pub async fn resolve_reference(
    raw: Option<&str>,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<AccountId> {
    match AccountReference::parse(raw)? {
        AccountReference::Explicit(id) => Ok(id),
        AccountReference::EvmAddress(address) => get_hedera_account_id(&address, mirror).await,
        AccountReference::ContextDefault => resolve_account(None, context, client),
    }
}

/// Public key of the default account.
///
/// A context account's key comes from the mirror node, since the client only holds
/// the operator's key. Without a context account the operator key is used.
pub async fn get_default_public_key(
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<PublicKey> {
    if let Some(account_id) = context.account_id {
        if client.operator_account_id() == Some(account_id) {
            if let Some(key) = client.operator_public_key() {
                return Ok(key);
            }
        }
        let account = mirror.get_account(&account_id.to_string()).await?;
        let (Some(key_type), Some(key)) = (account.key_type, account.account_public_key) else {
            return Err(LedgerError::Resolution(format!(
                "No public key recorded for account {}",
                account_id
            )));
        };
        let algorithm = KeyAlgorithm::from_mirror_type(&key_type).ok_or_else(|| {
            LedgerError::Resolution(format!(
                "Account {} has unsupported key type '{}'",
                account_id, key_type
            ))
        })?;
        return PublicKey::from_mirror(algorithm, &key);
    }

    client
        .operator_public_key()
        .ok_or_else(|| LedgerError::resolution("Could not determine default public key"))
}

/// Canonical `shard.realm.num` form, as opposed to an EVM hex address.
pub fn is_hedera_address(reference: &str) -> bool {
    reference.parse::<AccountId>().is_ok()
}

pub async fn get_hedera_evm_address(reference: &str, mirror: &dyn MirrorNode) -> LedgerResult<String> {
    if is_evm_address(reference) {
        return Ok(reference.to_string());
    }
    if !is_hedera_address(reference) {
        return Err(LedgerError::Validation(format!(
            "Invalid account reference '{}': expected shard.realm.num or an EVM address",
            reference
        )));
    }
    let account = mirror.get_account(reference).await?;
    debug!("Resolved {} to EVM address {:?}", reference, account.evm_address);
    account
        .evm_address
        .filter(|address| is_evm_address(address))
        .ok_or_else(|| LedgerError::Resolution(format!("No EVM address found for account {}", reference)))
}

pub async fn get_hedera_account_id(reference: &str, mirror: &dyn MirrorNode) -> LedgerResult<AccountId> {
    if is_hedera_address(reference) {
        return reference.parse();
    }
    if !is_evm_address(reference) {
        return Err(LedgerError::Validation(format!(
            "Invalid account reference '{}': expected shard.realm.num or an EVM address",
            reference
        )));
    }
    let account = mirror.get_account(reference).await?;
    debug!("Resolved {} to account {}", reference, account.account_id);
    account.account_id.parse().map_err(|_| {
        LedgerError::Resolution(format!("No Hedera account found for EVM address {}", reference))
    })
}
