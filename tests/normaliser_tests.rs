mod common;

use common::*;
use hedera_mcp_server::{
    blockchain::{
        keys::{KeyMaterial, PublicKey},
        models::*,
        params,
        services::{account, evm, key_type::detect_key_type, normaliser},
    },
    utils::parse_tool_args,
};
use serde_json::json;

fn autonomous() -> ExecutionContext {
    context(ExecutionMode::Autonomous, None)
}

#[tokio::test]
async fn test_initial_supply_cannot_exceed_max_supply() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();
    let raw: params::CreateFungibleTokenParams = parse_tool_args(&json!({
        "token_name": "Coin",
        "token_symbol": "CN",
        "initial_supply": 2000,
        "max_supply": 1000,
        "supply_type": "finite",
        "decimals": 0
    }))
    .unwrap();

    let err = normaliser::normalise_create_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cannot exceed max supply"));
    assert_eq!(err.to_string(), "Initial supply (2000) cannot exceed max supply (1000)");
}

#[tokio::test]
async fn test_fungible_token_scales_supply_and_defaults() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();
    let raw: params::CreateFungibleTokenParams = parse_tool_args(&json!({
        "token_name": "Coin",
        "token_symbol": "CN",
        "initial_supply": "12.5",
        "decimals": 2,
        "admin_key": true,
        "freeze_key": false
    }))
    .unwrap();

    let token = normaliser::normalise_create_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(token.initial_supply, 1250);
    assert_eq!(token.supply_type, TokenSupplyType::Finite);
    assert_eq!(token.max_supply, Some(100_000_000));
    assert_eq!(token.token_type, TokenType::FungibleCommon);
    assert_eq!(token.treasury_account_id, OPERATOR);
    assert_eq!(token.auto_renew_account_id, Some(OPERATOR));
    assert_eq!(token.keys.admin_key.as_ref(), Some(operator_key().public_key()));
    assert_eq!(token.keys.freeze_key, None);
    assert_eq!(token.keys.supply_key, None);
}

#[tokio::test]
async fn test_infinite_supply_rejects_max_supply() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();
    let raw: params::CreateFungibleTokenParams = parse_tool_args(&json!({
        "token_name": "Coin",
        "token_symbol": "CN",
        "supply_type": "infinite",
        "max_supply": 10
    }))
    .unwrap();
    assert!(normaliser::normalise_create_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .is_err());
}

#[tokio::test]
async fn test_treasury_requires_some_default() {
    let client = MockLedgerClient::without_operator();
    let mirror = MockMirrorNode::new();
    let raw: params::CreateFungibleTokenParams =
        parse_tool_args(&json!({ "token_name": "Coin", "token_symbol": "CN" })).unwrap();

    let err = normaliser::normalise_create_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Must include treasury account ID");
    assert_eq!(err.kind(), "resolution_error");
}

#[tokio::test]
async fn test_caller_key_comes_from_context_account_on_mirror() {
    let client = MockLedgerClient::with_operator();
    let context_key = KeyMaterial::generate(KeyAlgorithm::Ed25519);
    let mirror = MockMirrorNode::new().with_account("0.0.1001", "ED25519", Some(context_key.public_key()), None);
    let explicit = KeyMaterial::generate(KeyAlgorithm::EcdsaSecp256k1);

    let raw: params::CreateFungibleTokenParams = parse_tool_args(&json!({
        "token_name": "Coin",
        "token_symbol": "CN",
        "admin_key": true,
        "supply_key": true,
        "kyc_key": explicit.public_key().to_string_der()
    }))
    .unwrap();
    let ctx = context(ExecutionMode::ReturnBytes, Some(CONTEXT));
    let token = normaliser::normalise_create_fungible_token_params(raw, &ctx, &client, &mirror)
        .await
        .unwrap();

    assert_eq!(token.treasury_account_id, CONTEXT);
    assert_eq!(token.keys.admin_key.as_ref(), Some(context_key.public_key()));
    assert_eq!(token.keys.supply_key.as_ref(), Some(context_key.public_key()));
    assert_eq!(token.keys.kyc_key.as_ref(), Some(explicit.public_key()));
    // the caller key is looked up once and reused
    assert_eq!(mirror.lookups(), 1);
}

#[tokio::test]
async fn test_nft_always_has_a_supply_key() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();
    let raw: params::CreateNonFungibleTokenParams =
        parse_tool_args(&json!({ "token_name": "Art", "token_symbol": "ART", "supply_key": false })).unwrap();

    let token = normaliser::normalise_create_non_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(token.token_type, TokenType::NonFungibleUnique);
    assert_eq!(token.supply_type, TokenSupplyType::Finite);
    assert_eq!(token.max_supply, Some(100));
    assert_eq!(token.keys.supply_key.as_ref(), Some(operator_key().public_key()));
    assert_eq!(token.keys.admin_key, None);
}

#[tokio::test]
async fn test_hbar_transfer_balances_to_zero() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();
    let raw: params::TransferHbarParams = parse_tool_args(&json!({
        "transfers": [
            { "account_id": "0.0.800", "amount": "1.5" },
            { "account_id": "0.0.801", "amount": 0.25 }
        ],
        "transaction_memo": "rent"
    }))
    .unwrap();

    let normalised = normaliser::normalise_transfer_hbar_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(
        normalised.hbar_transfers.entries(),
        &[
            Transfer::new(AccountId::new(0, 0, 800), 150_000_000),
            Transfer::new(AccountId::new(0, 0, 801), 25_000_000),
            Transfer::new(OPERATOR, -175_000_000),
        ]
    );
    assert_eq!(normalised.hbar_transfers.sum(), 0);
    assert_eq!(normalised.transaction_memo.as_deref(), Some("rent"));
}

#[tokio::test]
async fn test_hbar_transfer_rejects_non_positive_amounts() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();
    for amount in [json!(0), json!(-3)] {
        let raw: params::TransferHbarParams =
            parse_tool_args(&json!({ "transfers": [{ "account_id": "0.0.800", "amount": amount }] })).unwrap();
        let err = normaliser::normalise_transfer_hbar_params(raw, &autonomous(), &client, &mirror)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid transfer amount"));
    }
}

#[tokio::test]
async fn test_hbar_transfer_resolves_evm_recipients() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new().with_account("0.0.4242", "ECDSA_SECP256K1", None, Some(ECDSA_EVM_ADDRESS));
    let raw: params::TransferHbarParams = parse_tool_args(&json!({
        "transfers": [{ "account_id": ECDSA_EVM_ADDRESS, "amount": 1 }],
        "source_account_id": "0.0.77"
    }))
    .unwrap();

    let normalised = normaliser::normalise_transfer_hbar_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(
        normalised.hbar_transfers.entries(),
        &[
            Transfer::new(AccountId::new(0, 0, 4242), 100_000_000),
            Transfer::new(AccountId::new(0, 0, 77), -100_000_000),
        ]
    );
}

#[tokio::test]
async fn test_airdrop_appends_single_balancing_entry() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new().with_token("0.0.5005", 0);
    let raw: params::AirdropFungibleTokenParams = parse_tool_args(&json!({
        "token_id": "0.0.5005",
        "source_account_id": "0.0.10",
        "recipients": [
            { "account_id": "0.0.11", "amount": 50 },
            { "account_id": "0.0.12", "amount": 20 }
        ]
    }))
    .unwrap();

    let normalised = normaliser::normalise_airdrop_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(
        normalised.token_transfers.entries(),
        &[
            Transfer::new(AccountId::new(0, 0, 11), 50),
            Transfer::new(AccountId::new(0, 0, 12), 20),
            Transfer::new(AccountId::new(0, 0, 10), -70),
        ]
    );
}

#[tokio::test]
async fn test_airdrop_scales_by_token_decimals() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new().with_token("0.0.5006", 6);
    let raw: params::AirdropFungibleTokenParams = parse_tool_args(&json!({
        "token_id": "0.0.5006",
        "recipients": [{ "account_id": "0.0.11", "amount": "0.5" }]
    }))
    .unwrap();

    let normalised = normaliser::normalise_airdrop_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(normalised.token_transfers.entries()[0].amount, 500_000);
    assert_eq!(normalised.token_transfers.sum(), 0);

    let raw: params::AirdropFungibleTokenParams = parse_tool_args(&json!({
        "token_id": "0.0.5006",
        "recipients": [{ "account_id": "0.0.11", "amount": 0 }]
    }))
    .unwrap();
    let err = normaliser::normalise_airdrop_fungible_token_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid recipient amount"));
}

#[tokio::test]
async fn test_resolve_account_precedence() {
    let with_operator = MockLedgerClient::with_operator();
    let no_context = autonomous();
    let with_context = context(ExecutionMode::Autonomous, Some(CONTEXT));

    // explicit beats context
    assert_eq!(
        account::resolve_account(Some("0.0.55"), &with_context, &with_operator).unwrap(),
        AccountId::new(0, 0, 55)
    );
    // context beats operator
    assert_eq!(account::resolve_account(None, &with_context, &with_operator).unwrap(), CONTEXT);
    // operator is the last resort
    assert_eq!(account::resolve_account(None, &no_context, &with_operator).unwrap(), OPERATOR);

    let nobody = MockLedgerClient::without_operator();
    let err = account::resolve_account(None, &no_context, &nobody).unwrap_err();
    assert_eq!(err.kind(), "resolution_error");
}

#[tokio::test]
async fn test_address_conversions() {
    let mirror = MockMirrorNode::new().with_account("0.0.4242", "ECDSA_SECP256K1", None, Some(ECDSA_EVM_ADDRESS));

    assert!(account::is_hedera_address("0.0.4242"));
    assert!(!account::is_hedera_address(ECDSA_EVM_ADDRESS));

    assert_eq!(
        account::get_hedera_evm_address(ECDSA_EVM_ADDRESS, &mirror).await.unwrap(),
        ECDSA_EVM_ADDRESS
    );
    assert_eq!(mirror.lookups(), 0);
    assert_eq!(
        account::get_hedera_evm_address("0.0.4242", &mirror).await.unwrap(),
        ECDSA_EVM_ADDRESS
    );
    assert_eq!(
        account::get_hedera_account_id(ECDSA_EVM_ADDRESS, &mirror).await.unwrap(),
        AccountId::new(0, 0, 4242)
    );
    assert_eq!(mirror.lookups(), 2);

    let err = account::get_hedera_evm_address("0.0.9999", &mirror).await.unwrap_err();
    assert_eq!(err.kind(), "resolution_error");
}

#[tokio::test]
async fn test_key_detection_follows_recorded_algorithm() {
    let ed_account = AccountId::new(0, 0, 3001);
    let ec_account = AccountId::new(0, 0, 3002);
    let mirror = MockMirrorNode::new()
        .with_account("0.0.3001", "ED25519", None, None)
        .with_account("0.0.3002", "ECDSA_SECP256K1", None, None)
        .with_account("0.0.3003", "RSA_3072", None, None);

    let err = detect_key_type(&mirror, &ed_account, ECDSA_KEY).await.unwrap_err();
    assert_eq!(err.kind(), "key_detection_error");
    assert!(err.to_string().contains("0.0.3001"));

    let key = detect_key_type(&mirror, &ec_account, ECDSA_KEY).await.unwrap();
    assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaSecp256k1);
    assert_eq!(key.public_key().to_evm_address().as_deref(), Some(ECDSA_EVM_ADDRESS));

    let err = detect_key_type(&mirror, &AccountId::new(0, 0, 3003), ECDSA_KEY)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "key_detection_error");

    // no caching: every call is a fresh read
    assert_eq!(mirror.lookups(), 3);
}

#[tokio::test]
async fn test_account_update_forwards_only_present_fields() {
    let client = MockLedgerClient::with_operator();
    let raw: params::UpdateAccountParams = parse_tool_args(&json!({ "account_memo": "hello" })).unwrap();

    let normalised = normaliser::normalise_update_account_params(raw, &autonomous(), &client).unwrap();
    assert_eq!(normalised.account_id, OPERATOR);
    assert_eq!(normalised.account_memo.as_deref(), Some("hello"));
    assert_eq!(normalised.decline_staking_reward, None);
    assert_eq!(normalised.max_automatic_token_associations, None);
    assert_eq!(normalised.staked_account_id, None);

    let raw: params::UpdateAccountParams =
        parse_tool_args(&json!({ "account_id": "0.0.90", "decline_staking_reward": false })).unwrap();
    let normalised = normaliser::normalise_update_account_params(raw, &autonomous(), &client).unwrap();
    assert_eq!(normalised.decline_staking_reward, Some(false));
    assert_eq!(normalised.account_memo, None);
}

#[tokio::test]
async fn test_account_delete_needs_a_distinct_transfer_target() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();

    let raw: params::DeleteAccountParams = parse_tool_args(&json!({ "account_id": "0.0.90" })).unwrap();
    let normalised = normaliser::normalise_delete_account_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(normalised.transfer_account_id, OPERATOR);

    let raw: params::DeleteAccountParams = parse_tool_args(&json!({ "account_id": "0.0.2" })).unwrap();
    let err = normaliser::normalise_delete_account_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn test_topic_submit_key_only_when_requested() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new();

    let raw: params::CreateTopicParams = parse_tool_args(&json!({ "topic_memo": "news" })).unwrap();
    let topic = normaliser::normalise_create_topic_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(topic.submit_key, None);
    assert_eq!(topic.auto_renew_account_id, Some(OPERATOR));

    let raw: params::CreateTopicParams = parse_tool_args(&json!({ "submit_key": true })).unwrap();
    let topic = normaliser::normalise_create_topic_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(topic.submit_key.as_ref(), Some(operator_key().public_key()));
}

#[tokio::test]
async fn test_mint_and_account_creation() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new().with_token("0.0.5005", 2);

    let raw: params::MintFungibleTokenParams =
        parse_tool_args(&json!({ "token_id": "0.0.5005", "amount": "3.25" })).unwrap();
    let mint = normaliser::normalise_mint_fungible_token_params(raw, &mirror).await.unwrap();
    assert_eq!(mint.amount, 325);

    let long_uri = "ipfs://".to_string() + &"a".repeat(100);
    let raw: params::MintNonFungibleTokenParams =
        parse_tool_args(&json!({ "token_id": "0.0.5005", "uris": [long_uri] })).unwrap();
    assert!(normaliser::normalise_mint_non_fungible_token_params(raw).is_err());

    let raw: params::CreateAccountParams = parse_tool_args(&json!({ "initial_balance": "0.5" })).unwrap();
    let created = normaliser::normalise_create_account_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(created.initial_balance, 50_000_000);
    assert_eq!(&created.public_key, operator_key().public_key());

    let other: PublicKey = KeyMaterial::generate(KeyAlgorithm::Ed25519).public_key().clone();
    let raw: params::CreateAccountParams =
        parse_tool_args(&json!({ "public_key": other.to_string_der() })).unwrap();
    let created = normaliser::normalise_create_account_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(created.public_key, other);
}

#[tokio::test]
async fn test_erc20_transfer_resolves_hedera_recipient() {
    let mirror = MockMirrorNode::new()
        .with_account("0.0.4242", "ECDSA_SECP256K1", None, Some(ECDSA_EVM_ADDRESS));
    let raw: params::TransferErc20Params = parse_tool_args(&json!({
        "contract_id": "0.0.7000",
        "recipient_address": "0.0.4242",
        "amount": 500
    }))
    .unwrap();

    let call = evm::normalise_transfer_erc20_params(raw, &mirror).await.unwrap();
    assert_eq!(call.contract_id, ContractId::new(0, 0, 7000));
    assert_eq!(call.gas, evm::CONTRACT_CALL_GAS);
    assert_eq!(hex::encode(&call.function_parameters[..4]), "a9059cbb");
    assert_eq!(hex::encode(&call.function_parameters[16..36]), &ECDSA_EVM_ADDRESS[2..]);
}

#[tokio::test]
async fn test_erc721_mint_defaults_to_caller_address() {
    let client = MockLedgerClient::with_operator();
    let mirror = MockMirrorNode::new().with_account("0.0.2", "ECDSA_SECP256K1", None, Some(ECDSA_EVM_ADDRESS));
    let raw: params::MintErc721Params = parse_tool_args(&json!({ "contract_id": "0.0.7001" })).unwrap();

    let call = evm::normalise_mint_erc721_params(raw, &autonomous(), &client, &mirror)
        .await
        .unwrap();
    assert_eq!(call.function_parameters.len(), 4 + 32);
    assert_eq!(hex::encode(&call.function_parameters[16..36]), &ECDSA_EVM_ADDRESS[2..]);
}
