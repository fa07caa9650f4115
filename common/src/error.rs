use thiserror::Error;

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unexpected end of data: need {needed} bytes at offset {offset}, have {available}")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Value does not fit in {0}")]
    Overflow(&'static str),

    #[error("Invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("Invalid boolean word")]
    InvalidBool,

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Expected {expected} return values, got {found}")]
    Arity { expected: usize, found: usize },

    #[error("Invalid hex data: {0}")]
    InvalidHex(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response for {method}: {reason}")]
    InvalidResponse { method: &'static str, reason: String },

    #[error("Execution reverted: {0}")]
    Execution(String),

    #[error("No contract deployed at {0:#x}")]
    UnknownContract(Address),

    #[error("Unsupported operation '{0}'")]
    UnsupportedCall(String),

    #[error(transparent)]
    Abi(#[from] AbiError),
}

#[cfg(feature = "rpc-client")]
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
