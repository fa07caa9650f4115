// Chain-level primitive types shared by the client, the harness steps and the
// simulated chain.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt::{Display, Error, Formatter};

use crate::error::AbiError;

pub use primitive_types::{H160, H256, U256};

/// 20-byte account identifier (EOA or contract)
pub type Address = H160;

/// 32-byte transaction hash
pub type TxHash = H256;

pub const ADDRESS_SIZE: usize = 20;

// Keccak-256 as used by the EVM for selectors, event topics and addresses
#[inline]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

// Full lowercase 0x-prefixed form
pub fn format_address(address: &Address) -> String {
    format!("{:#x}", address)
}

// Shortened form for log lines: 0x12345678…
pub fn short_address(address: &Address) -> String {
    let full = format_address(address);
    format!("{}…", &full[..10])
}

pub fn parse_address(value: &str) -> Result<Address, AbiError> {
    let stripped = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let bytes = hex::decode(stripped).map_err(|_| AbiError::InvalidAddress(value.to_owned()))?;
    if bytes.len() != ADDRESS_SIZE {
        return Err(AbiError::InvalidAddress(value.to_owned()));
    }

    Ok(Address::from_slice(&bytes))
}

/// Which chain we are talking to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIdentity {
    pub chain_id: u64,
    pub name: String,
}

impl Display for ChainIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{} (Chain ID: {})", self.name, self.chain_id)
    }
}

/// Block-level facts read at a validation point.
///
/// Snapshots are never mutated: every check point takes a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub chain_id: u64,
    pub block_number: u64,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    pub coinbase: Address,
    pub gas_limit: u64,
}

/// A single event emitted by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

/// Receipt of an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// false when the transaction was included but reverted
    pub status: bool,
    pub contract_address: Option<Address>,
    pub logs: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty_input() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_parse_and_format_address() {
        let raw = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        let address = parse_address(raw).unwrap();
        assert_eq!(format_address(&address), raw);
        assert_eq!(short_address(&address), "0xf39fd6e5…");

        // Checksummed input is accepted
        let upper = parse_address("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(upper, address);
    }

    #[test]
    fn test_parse_address_rejects_wrong_length() {
        assert!(matches!(
            parse_address("0x1234"),
            Err(AbiError::InvalidAddress(_))
        ));
        assert!(parse_address("not hex").is_err());
    }
}
