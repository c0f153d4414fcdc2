//! Turns raw, agent-supplied tool parameters into fully specified transaction parameters.
//!
//! Every function here runs before anything is built or sent. Defaults (treasury,
//! auto-renew, caller key) come from the execution context and client passed in,
//! never from globals, and every violated invariant is a specific error naming the
//! values involved.

use rust_decimal::Decimal;

use crate::blockchain::{
    client::LedgerClient,
    keys::PublicKey,
    mirror_node::MirrorNode,
    models::{self, *},
    params,
    services::{
        account::{get_default_account, get_default_public_key, resolve_account, resolve_reference},
        amount::{hbar_to_tinybars, to_base_units},
    },
};

/// Whole-token max supply used for finite fungible tokens created without one.
pub const DEFAULT_FUNGIBLE_MAX_SUPPLY: i64 = 1_000_000;

pub const DEFAULT_NFT_MAX_SUPPLY: i64 = 100;

/// Ledger limit on the metadata attached to a single NFT serial.
pub const MAX_NFT_METADATA_BYTES: usize = 100;

/// Looks up the caller's default public key at most once per normalisation.
struct CallerKey<'a> {
    context: &'a ExecutionContext,
    client: &'a dyn LedgerClient,
    mirror: &'a dyn MirrorNode,
    cached: Option<PublicKey>,
}

impl<'a> CallerKey<'a> {
    fn new(context: &'a ExecutionContext, client: &'a dyn LedgerClient, mirror: &'a dyn MirrorNode) -> Self {
        Self {
            context,
            client,
            mirror,
            cached: None,
        }
    }

    async fn get(&mut self) -> LedgerResult<PublicKey> {
        if let Some(key) = &self.cached {
            return Ok(key.clone());
        }
        let key = get_default_public_key(self.context, self.client, self.mirror).await?;
        self.cached = Some(key.clone());
        Ok(key)
    }
}

async fn resolve_capability(
    capability: &KeyCapability,
    caller: &mut CallerKey<'_>,
) -> LedgerResult<Option<PublicKey>> {
    match capability {
        KeyCapability::Unset => Ok(None),
        KeyCapability::UseCallerDefaultKey => caller.get().await.map(Some),
        KeyCapability::Explicit(key) => key.parse::<PublicKey>().map(Some),
    }
}

async fn resolve_treasury(
    raw: Option<&str>,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<AccountId> {
    resolve_reference(raw, context, client, mirror)
        .await
        .map_err(|e| match e {
            LedgerError::Resolution(_) => LedgerError::resolution("Must include treasury account ID"),
            other => other,
        })
}

async fn token_decimals(token_id: &TokenId, mirror: &dyn MirrorNode) -> LedgerResult<u32> {
    Ok(mirror.get_token_info(&token_id.to_string()).await?.decimals)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn normalise_create_fungible_token_params(
    params: params::CreateFungibleTokenParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<CreateTokenParams> {
    let decimals = params.decimals.unwrap_or(0);
    let supply_type = params.supply_type.unwrap_or_default();

    let initial_display = params.initial_supply.unwrap_or(Decimal::ZERO);
    if initial_display < Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "Initial supply must not be negative, got {}",
            initial_display
        )));
    }
    let initial_supply = to_base_units(initial_display, decimals)?;

    let max_supply = match supply_type {
        TokenSupplyType::Infinite => {
            if let Some(max) = params.max_supply {
                return Err(LedgerError::Validation(format!(
                    "Max supply ({}) cannot be set on an infinite supply token",
                    max
                )));
            }
            None
        }
        TokenSupplyType::Finite => {
            let max_display = params
                .max_supply
                .unwrap_or_else(|| Decimal::from(DEFAULT_FUNGIBLE_MAX_SUPPLY));
            let max = to_base_units(max_display, decimals)?;
            if max <= 0 {
                return Err(LedgerError::Validation(format!(
                    "Max supply must be positive, got {}",
                    max_display
                )));
            }
            if initial_supply > max {
                return Err(LedgerError::Validation(format!(
                    "Initial supply ({}) cannot exceed max supply ({})",
                    initial_supply, max
                )));
            }
            Some(max)
        }
    };

    let treasury_account_id =
        resolve_treasury(params.treasury_account_id.as_deref(), context, client, mirror).await?;

    let mut caller = CallerKey::new(context, client, mirror);
    let keys = TokenKeys {
        admin_key: resolve_capability(&params.admin_key, &mut caller).await?,
        supply_key: resolve_capability(&params.supply_key, &mut caller).await?,
        freeze_key: resolve_capability(&params.freeze_key, &mut caller).await?,
        wipe_key: resolve_capability(&params.wipe_key, &mut caller).await?,
        kyc_key: resolve_capability(&params.kyc_key, &mut caller).await?,
        pause_key: resolve_capability(&params.pause_key, &mut caller).await?,
    };

    Ok(CreateTokenParams {
        token_name: params.token_name,
        token_symbol: params.token_symbol,
        token_memo: non_empty(params.token_memo),
        token_type: TokenType::FungibleCommon,
        supply_type,
        decimals,
        initial_supply,
        max_supply,
        treasury_account_id,
        auto_renew_account_id: get_default_account(context, client),
        keys,
    })
}

pub async fn normalise_create_non_fungible_token_params(
    params: params::CreateNonFungibleTokenParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<CreateTokenParams> {
    let treasury_account_id =
        resolve_treasury(params.treasury_account_id.as_deref(), context, client, mirror).await?;

    let mut caller = CallerKey::new(context, client, mirror);
    let admin_key = resolve_capability(&params.admin_key, &mut caller).await?;
    // an NFT without a supply key could never mint a serial
    let supply_key = match &params.supply_key {
        KeyCapability::Explicit(key) => key.parse::<PublicKey>()?,
        KeyCapability::Unset | KeyCapability::UseCallerDefaultKey => caller.get().await?,
    };

    Ok(CreateTokenParams {
        token_name: params.token_name,
        token_symbol: params.token_symbol,
        token_memo: non_empty(params.token_memo),
        token_type: TokenType::NonFungibleUnique,
        supply_type: TokenSupplyType::Finite,
        decimals: 0,
        initial_supply: 0,
        max_supply: Some(params.max_supply.unwrap_or(DEFAULT_NFT_MAX_SUPPLY)),
        treasury_account_id,
        auto_renew_account_id: get_default_account(context, client),
        keys: TokenKeys {
            admin_key,
            supply_key: Some(supply_key),
            ..TokenKeys::default()
        },
    })
}

pub async fn normalise_transfer_hbar_params(
    params: params::TransferHbarParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<models::TransferHbarParams> {
    let source = resolve_reference(params.source_account_id.as_deref(), context, client, mirror).await?;

    let mut credits = Vec::with_capacity(params.transfers.len() + 1);
    for entry in &params.transfers {
        if entry.amount <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "Invalid transfer amount: {}",
                entry.amount
            )));
        }
        let tinybars = hbar_to_tinybars(entry.amount)?;
        if tinybars == 0 {
            return Err(LedgerError::Validation(format!(
                "Invalid transfer amount: {} is below one tinybar",
                entry.amount
            )));
        }
        let recipient = resolve_reference(Some(entry.account_id.as_str()), context, client, mirror).await?;
        credits.push(Transfer::new(recipient, tinybars));
    }

    Ok(models::TransferHbarParams {
        hbar_transfers: TransferList::balanced(credits, source)?,
        transaction_memo: non_empty(params.transaction_memo),
    })
}

pub async fn normalise_airdrop_fungible_token_params(
    params: params::AirdropFungibleTokenParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<models::AirdropFungibleTokenParams> {
    let token_id: TokenId = params.token_id.parse()?;
    let source = resolve_reference(params.source_account_id.as_deref(), context, client, mirror).await?;
    let decimals = token_decimals(&token_id, mirror).await?;

    let mut credits = Vec::with_capacity(params.recipients.len() + 1);
    for recipient in &params.recipients {
        let amount = to_base_units(recipient.amount, decimals)?;
        if amount <= 0 {
            return Err(LedgerError::Validation(format!(
                "Invalid recipient amount: {}",
                recipient.amount
            )));
        }
        let account = resolve_reference(Some(recipient.account_id.as_str()), context, client, mirror).await?;
        credits.push(Transfer::new(account, amount));
    }

    Ok(models::AirdropFungibleTokenParams {
        token_id,
        token_transfers: TransferList::balanced(credits, source)?,
        transaction_memo: non_empty(params.transaction_memo),
    })
}

pub async fn normalise_mint_fungible_token_params(
    params: params::MintFungibleTokenParams,
    mirror: &dyn MirrorNode,
) -> LedgerResult<models::MintFungibleTokenParams> {
    let token_id: TokenId = params.token_id.parse()?;
    let decimals = token_decimals(&token_id, mirror).await?;
    let amount = to_base_units(params.amount, decimals)?;
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "Invalid mint amount: {}",
            params.amount
        )));
    }
    Ok(models::MintFungibleTokenParams { token_id, amount })
}

pub fn normalise_mint_non_fungible_token_params(
    params: params::MintNonFungibleTokenParams,
) -> LedgerResult<models::MintNonFungibleTokenParams> {
    let token_id: TokenId = params.token_id.parse()?;
    if params.uris.is_empty() {
        return Err(LedgerError::validation("At least one metadata URI is required"));
    }
    let metadata = params
        .uris
        .into_iter()
        .map(|uri| {
            if uri.len() > MAX_NFT_METADATA_BYTES {
                Err(LedgerError::Validation(format!(
                    "Metadata URI exceeds {} bytes: {}",
                    MAX_NFT_METADATA_BYTES, uri
                )))
            } else {
                Ok(uri.into_bytes())
            }
        })
        .collect::<LedgerResult<Vec<_>>>()?;
    Ok(models::MintNonFungibleTokenParams { token_id, metadata })
}

pub async fn normalise_create_account_params(
    params: params::CreateAccountParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<models::CreateAccountParams> {
    let public_key = match non_empty(params.public_key) {
        Some(key) => key.parse::<PublicKey>()?,
        None => get_default_public_key(context, client, mirror).await?,
    };

    let balance = params.initial_balance.unwrap_or(Decimal::ZERO);
    if balance < Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "Initial balance must not be negative, got {}",
            balance
        )));
    }

    Ok(models::CreateAccountParams {
        public_key,
        initial_balance: hbar_to_tinybars(balance)?,
        max_automatic_token_associations: params.max_automatic_token_associations,
        account_memo: non_empty(params.account_memo),
    })
}

/// Forwards only the fields the caller supplied; absence means "leave unchanged".
pub fn normalise_update_account_params(
    params: params::UpdateAccountParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
) -> LedgerResult<models::UpdateAccountParams> {
    let account_id = resolve_account(params.account_id.as_deref(), context, client)?;
    let staked_account_id = params
        .staked_account_id
        .as_deref()
        .map(str::parse::<AccountId>)
        .transpose()?;

    Ok(models::UpdateAccountParams {
        account_id,
        max_automatic_token_associations: params.max_automatic_token_associations,
        staked_account_id,
        account_memo: params.account_memo,
        decline_staking_reward: params.decline_staking_reward,
    })
}

pub async fn normalise_delete_account_params(
    params: params::DeleteAccountParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<models::DeleteAccountParams> {
    let account_id = resolve_reference(Some(params.account_id.as_str()), context, client, mirror).await?;
    let transfer_account_id = resolve_reference(params.transfer_account_id.as_deref(), context, client, mirror)
        .await
        .map_err(|e| match e {
            LedgerError::Resolution(_) => {
                LedgerError::resolution("Must include a transfer account ID for the remaining balance")
            }
            other => other,
        })?;
    if transfer_account_id == account_id {
        return Err(LedgerError::Validation(format!(
            "Transfer account ({}) must differ from the account being deleted",
            transfer_account_id
        )));
    }
    Ok(models::DeleteAccountParams {
        account_id,
        transfer_account_id,
    })
}

pub async fn normalise_create_topic_params(
    params: params::CreateTopicParams,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<models::CreateTopicParams> {
    let mut caller = CallerKey::new(context, client, mirror);
    Ok(models::CreateTopicParams {
        topic_memo: non_empty(params.topic_memo),
        auto_renew_account_id: get_default_account(context, client),
        submit_key: resolve_capability(&params.submit_key, &mut caller).await?,
        transaction_memo: non_empty(params.transaction_memo),
    })
}

pub fn normalise_submit_topic_message_params(
    params: params::SubmitTopicMessageParams,
) -> LedgerResult<models::SubmitTopicMessageParams> {
    if params.message.is_empty() {
        return Err(LedgerError::validation("Topic message must not be empty"));
    }
    Ok(models::SubmitTopicMessageParams {
        topic_id: params.topic_id.parse()?,
        message: params.message,
        transaction_memo: non_empty(params.transaction_memo),
    })
}
