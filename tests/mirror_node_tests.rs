use hedera_mcp_server::blockchain::{
    mirror_node::{MirrorNode, MirrorNodeClient},
    models::{AccountId, KeyAlgorithm},
    services::key_type::detect_key_type,
};
use mockito::{mock, server_url};

fn client(prefix: &str) -> MirrorNodeClient {
    MirrorNodeClient::new(&format!("{}/{}/", server_url(), prefix))
}

#[tokio::test]
async fn test_account_lookup_maps_key_and_balance() {
    let _m = mock("GET", "/mirror-accounts/api/v1/accounts/0.0.1001")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "account": "0.0.1001",
                "evm_address": "0x00000000000000000000000000000000000003e9",
                "balance": {"balance": 250000000, "timestamp": "1700000000.000000000"},
                "key": {"_type": "ED25519", "key": "3b6d2c1f61e3c2b0e4f0e3a8b5d3e6c1a2b4d6f8091a2b3c4d5e6f708192a3b4"}
            }"#,
        )
        .create();

    let info = client("mirror-accounts").get_account("0.0.1001").await.unwrap();
    assert_eq!(info.account_id, "0.0.1001");
    assert_eq!(info.key_type.as_deref(), Some("ED25519"));
    assert_eq!(info.balance, Some(250_000_000));
    assert_eq!(
        info.evm_address.as_deref(),
        Some("0x00000000000000000000000000000000000003e9")
    );
}

#[tokio::test]
async fn test_missing_account_is_a_resolution_error() {
    let _m = mock("GET", "/mirror-missing/api/v1/accounts/0.0.404")
        .with_status(404)
        .with_body(r#"{"_status": {"messages": [{"message": "Not found"}]}}"#)
        .create();

    let err = client("mirror-missing").get_account("0.0.404").await.unwrap_err();
    assert_eq!(err.kind(), "resolution_error");
    assert_eq!(err.to_string(), "Account 0.0.404 not found on mirror node");
}

#[tokio::test]
async fn test_server_error_is_a_network_error() {
    let _m = mock("GET", "/mirror-down/api/v1/tokens/0.0.5005")
        .with_status(500)
        .with_body("boom")
        .create();

    let err = client("mirror-down").get_token_info("0.0.5005").await.unwrap_err();
    assert_eq!(err.kind(), "network_error");
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_token_info_reads_string_decimals() {
    let _m = mock("GET", "/mirror-tokens/api/v1/tokens/0.0.5005")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "token_id": "0.0.5005",
                "name": "Coin",
                "symbol": "CN",
                "decimals": "6",
                "total_supply": "1000000000",
                "max_supply": "0",
                "supply_type": "INFINITE",
                "treasury_account_id": "0.0.1001"
            }"#,
        )
        .create();

    let token = client("mirror-tokens").get_token_info("0.0.5005").await.unwrap();
    assert_eq!(token.decimals, 6);
    assert_eq!(token.symbol, "CN");
    assert_eq!(token.supply_type.as_deref(), Some("INFINITE"));
    assert_eq!(token.treasury_account_id.as_deref(), Some("0.0.1001"));
}

#[tokio::test]
async fn test_key_detection_reads_the_network_every_time() {
    let m = mock("GET", "/mirror-detect/api/v1/accounts/0.0.1002")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"account": "0.0.1002", "key": {"_type": "ECDSA_SECP256K1", "key": "02aa"}}"#)
        .expect(2)
        .create();

    let mirror = client("mirror-detect");
    let account = AccountId::new(0, 0, 1002);
    let key = "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";
    for _ in 0..2 {
        let material = detect_key_type(&mirror, &account, key).await.unwrap();
        assert_eq!(material.algorithm(), KeyAlgorithm::EcdsaSecp256k1);
    }
    m.assert();
}

#[tokio::test]
async fn test_token_info_reads_numeric_decimals() {
    let _m = mock("GET", "/mirror-numeric/api/v1/tokens/0.0.5006")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token_id": "0.0.5006", "name": "Coin", "symbol": "CN", "decimals": 8}"#)
        .create();

    let token = client("mirror-numeric").get_token_info("0.0.5006").await.unwrap();
    assert_eq!(token.decimals, 8);
}

#[tokio::test]
async fn test_fractional_decimals_are_rejected() {
    let _m = mock("GET", "/mirror-bad-decimals/api/v1/tokens/0.0.5007")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token_id": "0.0.5007", "name": "Coin", "symbol": "CN", "decimals": 2.5}"#)
        .create();

    let err = client("mirror-bad-decimals").get_token_info("0.0.5007").await.unwrap_err();
    assert_eq!(err.kind(), "network_error");
}
