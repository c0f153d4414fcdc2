// src/blockchain/services/key_type.rs

use tracing::debug;

use crate::blockchain::{
    keys::KeyMaterial,
    mirror_node::MirrorNode,
    models::{AccountId, KeyAlgorithm, KeyDetectionError, LedgerResult},
};

/// Parses `key` under the algorithm the mirror node records for `account_id`.
///
/// The key string alone is ambiguous (32 bytes of hex is a valid seed for either
/// curve), so the network is asked every time. Nothing is cached.
pub async fn detect_key_type(
    mirror: &dyn MirrorNode,
    account_id: &AccountId,
    key: &str,
) -> LedgerResult<KeyMaterial> {
    let account = mirror.get_account(&account_id.to_string()).await?;
    let recorded = account.key_type.unwrap_or_default();
    debug!("Account {} records key type '{}'", account_id, recorded);

    Ok(parse_for_recorded_type(account_id, &recorded, key)?)
}

/// Pure half of [`detect_key_type`]: same inputs always give the same outcome.
pub fn parse_for_recorded_type(
    account_id: &AccountId,
    recorded: &str,
    key: &str,
) -> Result<KeyMaterial, KeyDetectionError> {
    let fail = |reason: String| KeyDetectionError {
        account_id: account_id.to_string(),
        reason,
    };
    let algorithm = KeyAlgorithm::from_mirror_type(recorded)
        .ok_or_else(|| fail(format!("unsupported key type '{}'", recorded)))?;
    KeyMaterial::parse(algorithm, key).map_err(|e| fail(format!("invalid {} key: {}", algorithm, e)))
}
