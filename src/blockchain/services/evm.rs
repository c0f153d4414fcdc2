// src/blockchain/services/evm.rs

use std::str::FromStr;

use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, U256};
use ethers_core::utils::keccak256;

use crate::blockchain::{
    client::LedgerClient,
    mirror_node::MirrorNode,
    models::*,
    params,
    services::account::{get_hedera_account_id, get_hedera_evm_address, resolve_account},
};

pub const ERC20_FACTORY_DEPLOY: &str = "deployToken(string,string,uint8,uint256)";
pub const ERC20_TRANSFER: &str = "transfer(address,uint256)";
pub const ERC721_FACTORY_DEPLOY: &str = "deployToken(string,string,string)";
pub const ERC721_SAFE_MINT: &str = "safeMint(address)";
pub const ERC721_TRANSFER_FROM: &str = "transferFrom(address,address,uint256)";

pub const FACTORY_DEPLOY_GAS: u64 = 3_000_000;
pub const CONTRACT_CALL_GAS: u64 = 100_000;

/// Factory contracts that deploy fresh ERC20/ERC721 tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvmFactories {
    pub erc20: Option<ContractId>,
    pub erc721: Option<ContractId>,
}

impl EvmFactories {
    /// Known deployments. Only testnet ships factories; other networks must configure them.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Testnet => Self {
                erc20: Some(ContractId::new(0, 0, 6_471_814)),
                erc721: Some(ContractId::new(0, 0, 6_510_666)),
            },
            _ => Self::default(),
        }
    }

    pub fn with_overrides(mut self, erc20: Option<ContractId>, erc721: Option<ContractId>) -> Self {
        if erc20.is_some() {
            self.erc20 = erc20;
        }
        if erc721.is_some() {
            self.erc721 = erc721;
        }
        self
    }
}

fn selector(signature: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(signature.as_bytes())[0..4]);
    sel
}

/// ABI call data: the 4-byte selector followed by the encoded arguments.
pub fn encode_function_call(signature: &str, args: Vec<Token>) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(&args));
    out
}

fn parse_address(evm_address: &str) -> LedgerResult<Address> {
    Address::from_str(evm_address)
        .map_err(|e| LedgerError::Validation(format!("Invalid EVM address '{}': {}", evm_address, e)))
}

async fn evm_address_of(reference: &str, mirror: &dyn MirrorNode) -> LedgerResult<Address> {
    parse_address(&get_hedera_evm_address(reference, mirror).await?)
}

async fn default_evm_address(
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<Address> {
    let account = resolve_account(None, context, client)?;
    evm_address_of(&account.to_string(), mirror).await
}

fn require_factory(factory: Option<ContractId>, kind: &str, network: Network) -> LedgerResult<ContractId> {
    factory.ok_or_else(|| {
        LedgerError::Resolution(format!(
            "No {} factory contract configured for {}",
            kind, network
        ))
    })
}

pub fn normalise_create_erc20_params(
    params: params::CreateErc20Params,
    factories: &EvmFactories,
    network: Network,
) -> LedgerResult<ContractExecuteParams> {
    let contract_id = require_factory(factories.erc20, "ERC20", network)?;
    let function_parameters = encode_function_call(
        ERC20_FACTORY_DEPLOY,
        vec![
            Token::String(params.token_name),
            Token::String(params.token_symbol),
            Token::Uint(U256::from(params.decimals)),
            Token::Uint(U256::from(params.initial_supply)),
        ],
    );
    Ok(ContractExecuteParams {
        contract_id,
        gas: FACTORY_DEPLOY_GAS,
        function_parameters,
    })
}

pub async fn normalise_transfer_erc20_params(
    params: params::TransferErc20Params,
    mirror: &dyn MirrorNode,
) -> LedgerResult<ContractExecuteParams> {
    let contract_id = get_hedera_account_id(&params.contract_id, mirror).await?;
    let recipient = evm_address_of(&params.recipient_address, mirror).await?;
    if params.amount == 0 {
        return Err(LedgerError::validation("Invalid transfer amount: 0"));
    }
    Ok(ContractExecuteParams {
        contract_id,
        gas: CONTRACT_CALL_GAS,
        function_parameters: encode_function_call(
            ERC20_TRANSFER,
            vec![Token::Address(recipient), Token::Uint(U256::from(params.amount))],
        ),
    })
}

pub fn normalise_create_erc721_params(
    params: params::CreateErc721Params,
    factories: &EvmFactories,
    network: Network,
) -> LedgerResult<ContractExecuteParams> {
    let contract_id = require_factory(factories.erc721, "ERC721", network)?;
    Ok(ContractExecuteParams {
        contract_id,
        gas: FACTORY_DEPLOY_GAS,
        function_parameters: encode_function_call(
            ERC721_FACTORY_DEPLOY,
            vec![
                Token::String(params.token_name),
                Token::String(params.token_symbol),
                Token::String(params.base_uri),
            ],
        ),
    })
}

pub async fn normalise_mint_erc721_params(
    params: params::MintErc721Params,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<ContractExecuteParams> {
    let contract_id = get_hedera_account_id(&params.contract_id, mirror).await?;
    let to = match params.to_address.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(reference) => evm_address_of(reference, mirror).await?,
        None => default_evm_address(context, client, mirror).await?,
    };
    Ok(ContractExecuteParams {
        contract_id,
        gas: CONTRACT_CALL_GAS,
        function_parameters: encode_function_call(ERC721_SAFE_MINT, vec![Token::Address(to)]),
    })
}

pub async fn normalise_transfer_erc721_params(
    params: params::TransferErc721Params,
    context: &ExecutionContext,
    client: &dyn LedgerClient,
    mirror: &dyn MirrorNode,
) -> LedgerResult<ContractExecuteParams> {
    let contract_id = get_hedera_account_id(&params.contract_id, mirror).await?;
    let from = match params.from_address.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(reference) => evm_address_of(reference, mirror).await?,
        None => default_evm_address(context, client, mirror).await?,
    };
    let to = evm_address_of(&params.to_address, mirror).await?;
    Ok(ContractExecuteParams {
        contract_id,
        gas: CONTRACT_CALL_GAS,
        function_parameters: encode_function_call(
            ERC721_TRANSFER_FROM,
            vec![
                Token::Address(from),
                Token::Address(to),
                Token::Uint(U256::from(params.token_id)),
            ],
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector(ERC20_TRANSFER)), "a9059cbb");
        assert_eq!(hex::encode(selector(ERC721_TRANSFER_FROM)), "23b872dd");
    }

    #[test]
    fn test_transfer_call_layout() {
        let to = Address::from_str("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1").unwrap();
        let data = encode_function_call(ERC20_TRANSFER, vec![Token::Address(to), Token::Uint(U256::from(500u64))]);
        assert_eq!(data.len(), 4 + 32 * 2);
        assert_eq!(&data[16..36], to.as_bytes());
        assert_eq!(data[67], 0xf4);
        assert_eq!(data[66], 0x01);
    }

    #[test]
    fn test_create_erc20_needs_a_factory() {
        let params = params::CreateErc20Params {
            token_name: "Coin".to_string(),
            token_symbol: "CN".to_string(),
            decimals: 18,
            initial_supply: 1000,
        };
        let err = normalise_create_erc20_params(params.clone(), &EvmFactories::for_network(Network::Mainnet), Network::Mainnet)
            .unwrap_err();
        assert_eq!(err.to_string(), "No ERC20 factory contract configured for mainnet");

        let built = normalise_create_erc20_params(params, &EvmFactories::for_network(Network::Testnet), Network::Testnet)
            .unwrap();
        assert_eq!(built.contract_id, ContractId::new(0, 0, 6_471_814));
        assert_eq!(built.gas, FACTORY_DEPLOY_GAS);
        assert_eq!(&built.function_parameters[..4], &selector(ERC20_FACTORY_DEPLOY));
    }

    #[test]
    fn test_factory_overrides() {
        let factories = EvmFactories::for_network(Network::Mainnet)
            .with_overrides(Some(ContractId::new(0, 0, 77)), None);
        assert_eq!(factories.erc20, Some(ContractId::new(0, 0, 77)));
        assert_eq!(factories.erc721, None);
    }
}
