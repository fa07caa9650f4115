// BunkerverseNFT contract surface
//
// The harness treats the contract as a black box. This module pins down the
// fixed set of functions it calls, how their results are decoded, and the
// Transfer event used to read minted token ids back from receipts.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    abi::{decode_hex, encode, event_topic, ContractCall, ParamType, Token},
    error::AbiError,
    types::{Address, BlockSnapshot, LogEntry, TxReceipt, H256, U256},
};

pub const CONTRACT_NAME: &str = "BunkerverseNFT";

pub const SAFE_MINT: &str = "safeMint(address,string)";
pub const BATCH_MINT: &str = "batchMint(address[],string[])";
pub const TRANSFER_FROM: &str = "transferFrom(address,address,uint256)";
pub const APPROVE: &str = "approve(address,uint256)";
pub const TOTAL_SUPPLY: &str = "totalSupply()";
pub const OWNER_OF: &str = "ownerOf(uint256)";
pub const TOKEN_URI: &str = "tokenURI(uint256)";
pub const GET_CONTRACT_INFO: &str = "getContractInfo()";
pub const VALIDATE_L3_CHAIN: &str = "validateL3Chain()";
pub const GET_NEXT_TOKEN_ID: &str = "getNextTokenId()";

pub const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

lazy_static! {
    pub static ref TRANSFER_TOPIC: H256 = event_topic(TRANSFER_EVENT);
}

/// Builders for every call the harness issues against the contract
pub struct NftCall;

impl NftCall {
    pub fn safe_mint(to: Address, uri: &str) -> ContractCall {
        ContractCall::new(
            SAFE_MINT,
            vec![Token::Address(to), Token::String(uri.to_owned())],
        )
    }

    pub fn batch_mint(recipients: &[Address], uris: &[String]) -> ContractCall {
        ContractCall::new(
            BATCH_MINT,
            vec![
                Token::Array(recipients.iter().copied().map(Token::Address).collect()),
                Token::Array(uris.iter().cloned().map(Token::String).collect()),
            ],
        )
    }

    pub fn transfer_from(from: Address, to: Address, token_id: u64) -> ContractCall {
        ContractCall::new(
            TRANSFER_FROM,
            vec![
                Token::Address(from),
                Token::Address(to),
                Token::Uint(U256::from(token_id)),
            ],
        )
    }

    pub fn approve(spender: Address, token_id: u64) -> ContractCall {
        ContractCall::new(
            APPROVE,
            vec![Token::Address(spender), Token::Uint(U256::from(token_id))],
        )
    }

    pub fn total_supply() -> ContractCall {
        ContractCall::new(TOTAL_SUPPLY, Vec::new()).with_returns(vec![ParamType::Uint])
    }

    pub fn owner_of(token_id: u64) -> ContractCall {
        ContractCall::new(OWNER_OF, vec![Token::Uint(U256::from(token_id))])
            .with_returns(vec![ParamType::Address])
    }

    pub fn token_uri(token_id: u64) -> ContractCall {
        ContractCall::new(TOKEN_URI, vec![Token::Uint(U256::from(token_id))])
            .with_returns(vec![ParamType::String])
    }

    pub fn get_contract_info() -> ContractCall {
        ContractCall::new(GET_CONTRACT_INFO, Vec::new()).with_returns(ContractInfo::return_types())
    }

    pub fn validate_l3_chain() -> ContractCall {
        ContractCall::new(VALIDATE_L3_CHAIN, Vec::new()).with_returns(L3ChainView::return_types())
    }

    pub fn get_next_token_id() -> ContractCall {
        ContractCall::new(GET_NEXT_TOKEN_ID, Vec::new()).with_returns(vec![ParamType::Uint])
    }
}

/// Constructor takes the initial owner / admin
pub fn encode_constructor_args(admin: Address) -> Vec<u8> {
    encode(&[Token::Address(admin)])
}

// Pull exactly one value out of a return list
pub fn single(tokens: Vec<Token>) -> Result<Token, AbiError> {
    let found = tokens.len();
    let mut iter = tokens.into_iter();
    match (iter.next(), iter.next()) {
        (Some(token), None) => Ok(token),
        _ => Err(AbiError::Arity { expected: 1, found }),
    }
}

fn expect_arity(tokens: &[Token], expected: usize) -> Result<(), AbiError> {
    if tokens.len() != expected {
        return Err(AbiError::Arity {
            expected,
            found: tokens.len(),
        });
    }
    Ok(())
}

/// Result of `getContractInfo()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    pub version: String,
    pub chain_name: String,
    pub chain_id: u64,
}

impl ContractInfo {
    pub fn return_types() -> Vec<ParamType> {
        vec![
            ParamType::String,
            ParamType::String,
            ParamType::Uint,
            ParamType::String,
            ParamType::String,
            ParamType::Uint,
        ]
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, AbiError> {
        expect_arity(&tokens, 6)?;
        let mut iter = tokens.into_iter();
        let mut next = || iter.next().ok_or(AbiError::Arity { expected: 6, found: 0 });
        Ok(Self {
            name: next()?.into_string()?,
            symbol: next()?.into_string()?,
            total_supply: next()?.into_u64()?,
            version: next()?.into_string()?,
            chain_name: next()?.into_string()?,
            chain_id: next()?.into_u64()?,
        })
    }

    pub fn into_tokens(self) -> Vec<Token> {
        vec![
            Token::String(self.name),
            Token::String(self.symbol),
            Token::Uint(U256::from(self.total_supply)),
            Token::String(self.version),
            Token::String(self.chain_name),
            Token::Uint(U256::from(self.chain_id)),
        ]
    }
}

/// Result of `validateL3Chain()`: the block facts as seen from inside the EVM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3ChainView {
    pub chain_id: u64,
    pub block_number: u64,
    pub timestamp: u64,
    pub coinbase: Address,
    pub gas_limit: u64,
}

impl L3ChainView {
    pub fn return_types() -> Vec<ParamType> {
        vec![
            ParamType::Uint,
            ParamType::Uint,
            ParamType::Uint,
            ParamType::Address,
            ParamType::Uint,
        ]
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, AbiError> {
        expect_arity(&tokens, 5)?;
        let mut iter = tokens.into_iter();
        let mut next = || iter.next().ok_or(AbiError::Arity { expected: 5, found: 0 });
        Ok(Self {
            chain_id: next()?.into_u64()?,
            block_number: next()?.into_u64()?,
            timestamp: next()?.into_u64()?,
            coinbase: next()?.into_address()?,
            gas_limit: next()?.into_u64()?,
        })
    }

    pub fn into_tokens(self) -> Vec<Token> {
        vec![
            Token::Uint(U256::from(self.chain_id)),
            Token::Uint(U256::from(self.block_number)),
            Token::Uint(U256::from(self.timestamp)),
            Token::Address(self.coinbase),
            Token::Uint(U256::from(self.gas_limit)),
        ]
    }

    pub fn from_snapshot(snapshot: &BlockSnapshot) -> Self {
        Self {
            chain_id: snapshot.chain_id,
            block_number: snapshot.block_number,
            timestamp: snapshot.timestamp,
            coinbase: snapshot.coinbase,
            gas_limit: snapshot.gas_limit,
        }
    }
}

/// Decoded `Transfer(address indexed from, address indexed to, uint256 indexed tokenId)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub token_id: u64,
}

fn topic_to_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}

fn address_to_topic(address: &Address) -> H256 {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(address.as_bytes());
    H256::from(bytes)
}

impl TransferEvent {
    /// Mints are transfers from the zero address
    pub fn is_mint(&self) -> bool {
        self.from.is_zero()
    }

    /// Returns `None` when the log is not an ERC721 Transfer
    pub fn from_log(log: &LogEntry) -> Option<Result<Self, AbiError>> {
        if log.topics.len() != 4 || log.topics[0] != *TRANSFER_TOPIC {
            return None;
        }

        let token_id = U256::from_big_endian(log.topics[3].as_bytes());
        Some(crate::abi::u256_to_u64(token_id).map(|token_id| Self {
            from: topic_to_address(&log.topics[1]),
            to: topic_to_address(&log.topics[2]),
            token_id,
        }))
    }

    pub fn to_log(&self, contract: Address) -> LogEntry {
        LogEntry {
            address: contract,
            topics: vec![
                *TRANSFER_TOPIC,
                address_to_topic(&self.from),
                address_to_topic(&self.to),
                H256::from_low_u64_be(self.token_id),
            ],
            data: Vec::new(),
        }
    }

    /// All Transfer events emitted by `contract` in this receipt, in log order
    pub fn collect(receipt: &TxReceipt, contract: &Address) -> Result<Vec<Self>, AbiError> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == *contract)
            .filter_map(Self::from_log)
            .collect()
    }
}

/// Compiled contract, as produced by the build toolchain
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub bytecode: Vec<u8>,
}

impl ContractArtifact {
    /// Load either a Hardhat/Foundry JSON artifact or a raw hex file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Error while reading artifact {}", path.display()))?;

        let artifact = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content)?
        } else {
            Self {
                contract_name: CONTRACT_NAME.to_owned(),
                bytecode: decode_hex(content.trim()).context("Invalid bytecode hex")?,
            }
        };

        if artifact.bytecode.is_empty() {
            anyhow::bail!("Artifact {} has empty bytecode", path.display());
        }
        Ok(artifact)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(content).context("Error while parsing artifact JSON")?;

        // Hardhat stores a string, Foundry an object with an `object` field
        let bytecode = match &value["bytecode"] {
            serde_json::Value::String(hex) => hex.as_str(),
            serde_json::Value::Object(obj) => obj
                .get("object")
                .and_then(|v| v.as_str())
                .context("Artifact bytecode object has no 'object' field")?,
            _ => anyhow::bail!("Artifact has no bytecode"),
        };

        Ok(Self {
            contract_name: value["contractName"]
                .as_str()
                .unwrap_or(CONTRACT_NAME)
                .to_owned(),
            bytecode: decode_hex(bytecode).context("Invalid bytecode hex")?,
        })
    }
}
