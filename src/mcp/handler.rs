//! # MCP Handler Module
//!
//! Implements the Model Context Protocol surface of the server. Every tool call
//! runs the same pipeline: deserialize and validate the raw arguments, normalise
//! them against the execution context, build one transaction, and finalise it
//! through the configured execution strategy.
//!
//! ## Supported Tools
//!
//! ### Tokens
//! - `create_fungible_token`, `create_non_fungible_token`
//! - `mint_fungible_token`, `mint_non_fungible_token`
//! - `airdrop_fungible_token`
//!
//! ### Accounts
//! - `transfer_hbar`
//! - `create_account`, `update_account`, `delete_account`
//!
//! ### Consensus
//! - `create_topic`, `submit_topic_message`
//!
//! ### EVM
//! - `create_erc20`, `transfer_erc20`
//! - `create_erc721`, `mint_erc721`, `transfer_erc721`

use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    blockchain::{
        models::*,
        params,
        services::{
            evm,
            execution::{handle_transaction, Describe},
            normaliser,
        },
        transaction::{Transaction, TransactionBuilder},
    },
    mcp::protocol::{error_codes, Request, Response},
    utils::parse_tool_args,
    AppState,
};

const TOOLS: &[(&str, &str)] = &[
    ("create_fungible_token", "Create a fungible token. Supply amounts are in whole tokens and scaled by decimals; management keys accept true (use your key), a public key, or false."),
    ("create_non_fungible_token", "Create an NFT collection with a finite supply. The supply key defaults to your key."),
    ("transfer_hbar", "Transfer HBAR from one account to one or more recipients."),
    ("airdrop_fungible_token", "Airdrop a fungible token to recipients. Amounts are in display units."),
    ("mint_fungible_token", "Mint additional units of a fungible token. Amount is in display units."),
    ("mint_non_fungible_token", "Mint NFTs with the given metadata URIs (at most 100 bytes each)."),
    ("create_account", "Create a new account, defaulting to your public key."),
    ("update_account", "Update account settings. Only the fields supplied are changed."),
    ("delete_account", "Delete an account and transfer its remaining balance."),
    ("create_topic", "Create a consensus topic, optionally restricting who may submit."),
    ("submit_topic_message", "Submit a message to a consensus topic."),
    ("create_erc20", "Deploy an ERC20 token through the factory contract."),
    ("transfer_erc20", "Transfer ERC20 tokens to a Hedera account id or EVM address."),
    ("create_erc721", "Deploy an ERC721 collection through the factory contract."),
    ("mint_erc721", "Mint an ERC721 token to a recipient, defaulting to your account."),
    ("transfer_erc721", "Transfer an ERC721 token between accounts."),
];

// Helper: produce a result Value that always contains a text content array
// and preserves structured data for JSON-friendly clients.
fn make_texty_result(text: String, payload: Value) -> Value {
    let content = json!([{ "type": "text", "text": text }]);
    match payload {
        Value::Object(mut map) => {
            if !map.contains_key("content") {
                map.insert("content".into(), content);
            }
            Value::Object(map)
        }
        other => json!({
            "data": other,
            "content": content
        }),
    }
}

fn tool_result(result: &ExecutionResult) -> Value {
    let payload = serde_json::to_value(result).unwrap_or_else(|e| json!({ "error": e.to_string() }));
    let mut value = make_texty_result(result.human_message.clone(), payload);
    if let Value::Object(map) = &mut value {
        map.insert("isError".into(), Value::Bool(result.is_error()));
    }
    value
}

fn describe(f: impl Fn(&TransactionReceipt) -> String + Send + Sync + 'static) -> Box<Describe> {
    Box::new(f)
}

fn id_or_unknown(id: Option<EntityId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "unknown".to_string())
}

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args);

    let Some(built) = build_transaction(tool_name, args, &state).await else {
        return Response::error(
            req.id.clone(),
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown tool: {}", tool_name),
        );
    };

    let result = match built {
        Ok((tx, describe)) => {
            handle_transaction(tx, state.client.as_ref(), &state.context, describe.as_ref()).await
        }
        Err(e) => {
            // nothing was built, so nothing was sent
            error!("{} rejected before submission: {}", tool_name, e);
            ExecutionResult::from_error(&e)
        }
    };

    Response::success(req.id.clone(), tool_result(&result))
}

/// Validates, normalises and builds the transaction for `tool`. `None` for unknown tools.
async fn build_transaction(
    tool: &str,
    args: &Value,
    state: &AppState,
) -> Option<LedgerResult<(Transaction, Box<Describe>)>> {
    let context = &state.context;
    let client = state.client.as_ref();
    let mirror = state.mirror.as_ref();

    let built = match tool {
        "create_fungible_token" => {
            (async {
                let raw: params::CreateFungibleTokenParams = parse_tool_args(args)?;
                let normalised =
                    normaliser::normalise_create_fungible_token_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::create_token(normalised),
                    describe(|r| format!("Token created successfully at address {}", id_or_unknown(r.token_id))),
                ))
            })
            .await
        }
        "create_non_fungible_token" => {
            (async {
                let raw: params::CreateNonFungibleTokenParams = parse_tool_args(args)?;
                let normalised =
                    normaliser::normalise_create_non_fungible_token_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::create_token(normalised),
                    describe(|r| format!("NFT collection created with token id {}", id_or_unknown(r.token_id))),
                ))
            })
            .await
        }
        "transfer_hbar" => {
            (async {
                let raw: params::TransferHbarParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_transfer_hbar_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::transfer_hbar(normalised),
                    describe(|r| format!("HBAR successfully transferred. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "airdrop_fungible_token" => {
            (async {
                let raw: params::AirdropFungibleTokenParams = parse_tool_args(args)?;
                let normalised =
                    normaliser::normalise_airdrop_fungible_token_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::airdrop_fungible_token(normalised),
                    describe(|r| format!("Token successfully airdropped. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "mint_fungible_token" => {
            (async {
                let raw: params::MintFungibleTokenParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_mint_fungible_token_params(raw, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::mint_fungible_token(normalised),
                    describe(|r| format!("Tokens successfully minted. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "mint_non_fungible_token" => {
            (async {
                let raw: params::MintNonFungibleTokenParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_mint_non_fungible_token_params(raw)?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::mint_non_fungible_token(normalised),
                    describe(|r| {
                        let serials: Vec<String> = r.serials.iter().map(|s| s.to_string()).collect();
                        format!("NFTs minted with serial numbers [{}]", serials.join(", "))
                    }),
                ))
            })
            .await
        }
        "create_account" => {
            (async {
                let raw: params::CreateAccountParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_create_account_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::create_account(normalised),
                    describe(|r| format!("Account created successfully with id {}", id_or_unknown(r.account_id))),
                ))
            })
            .await
        }
        "update_account" => {
            (async {
                let raw: params::UpdateAccountParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_update_account_params(raw, context, client)?;
                let account_id = normalised.account_id;
                Ok::<_, LedgerError>((
                    TransactionBuilder::update_account(normalised),
                    describe(move |r| format!("Account {} updated. Transaction ID: {}", account_id, r.transaction_id)),
                ))
            })
            .await
        }
        "delete_account" => {
            (async {
                let raw: params::DeleteAccountParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_delete_account_params(raw, context, client, mirror).await?;
                let account_id = normalised.account_id;
                Ok::<_, LedgerError>((
                    TransactionBuilder::delete_account(normalised),
                    describe(move |r| format!("Account {} deleted. Transaction ID: {}", account_id, r.transaction_id)),
                ))
            })
            .await
        }
        "create_topic" => {
            (async {
                let raw: params::CreateTopicParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_create_topic_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::create_topic(normalised),
                    describe(|r| format!("Topic created with id {}", id_or_unknown(r.topic_id))),
                ))
            })
            .await
        }
        "submit_topic_message" => {
            (async {
                let raw: params::SubmitTopicMessageParams = parse_tool_args(args)?;
                let normalised = normaliser::normalise_submit_topic_message_params(raw)?;
                let topic_id = normalised.topic_id;
                Ok::<_, LedgerError>((
                    TransactionBuilder::submit_topic_message(normalised),
                    describe(move |r| match r.topic_sequence_number {
                        Some(seq) => format!("Message submitted to topic {} with sequence number {}", topic_id, seq),
                        None => format!("Message submitted to topic {}", topic_id),
                    }),
                ))
            })
            .await
        }
        "create_erc20" => {
            (async {
                let raw: params::CreateErc20Params = parse_tool_args(args)?;
                let normalised = evm::normalise_create_erc20_params(raw, &state.factories, client.network())?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::execute_contract(normalised),
                    describe(|r| format!("ERC20 token deployed. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "transfer_erc20" => {
            (async {
                let raw: params::TransferErc20Params = parse_tool_args(args)?;
                let normalised = evm::normalise_transfer_erc20_params(raw, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::execute_contract(normalised),
                    describe(|r| format!("ERC20 tokens transferred. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "create_erc721" => {
            (async {
                let raw: params::CreateErc721Params = parse_tool_args(args)?;
                let normalised = evm::normalise_create_erc721_params(raw, &state.factories, client.network())?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::execute_contract(normalised),
                    describe(|r| format!("ERC721 collection deployed. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "mint_erc721" => {
            (async {
                let raw: params::MintErc721Params = parse_tool_args(args)?;
                let normalised = evm::normalise_mint_erc721_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::execute_contract(normalised),
                    describe(|r| format!("ERC721 token minted. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        "transfer_erc721" => {
            (async {
                let raw: params::TransferErc721Params = parse_tool_args(args)?;
                let normalised = evm::normalise_transfer_erc721_params(raw, context, client, mirror).await?;
                Ok::<_, LedgerError>((
                    TransactionBuilder::execute_contract(normalised),
                    describe(|r| format!("ERC721 token transferred. Transaction ID: {}", r.transaction_id)),
                ))
            })
            .await
        }
        _ => return None,
    };

    Some(built)
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "hedera_mcp",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions =
        "Hedera MCP server that turns loosely specified token, account, topic and EVM requests into ledger transactions.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request. Names and descriptions only.
fn handle_tools_list(req: &Request) -> Response {
    let tools: Vec<Value> = TOOLS
        .iter()
        .map(|(name, description)| json!({ "name": name, "description": description }))
        .collect();
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
