use orbit_common::{
    error::{AbiError, ClientError},
    types::Address,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::context::RunState;

/// How far an error reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    // Reported in the outcomes, the run can still pass
    Reported,
    // Fails the call it happened in and the run, later steps still execute
    CallFatal,
    // Stops all mutating operations and aborts the run
    Fatal,
}

/// Classification carried by every failed StepOutcome
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum ErrorKind {
    DeploymentFailed,
    WrongChainError,
    ArgumentMismatch,
    MintFailed,
    TransferRejected,
    TransferNotReflected,
    SupplyInvariantViolation,
    ValidationMismatch,
    ClientFailure,
    InvalidState,
}

impl ErrorKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::DeploymentFailed | Self::WrongChainError | Self::InvalidState => Severity::Fatal,
            Self::ArgumentMismatch | Self::MintFailed | Self::ClientFailure => Severity::CallFatal,
            Self::TransferRejected
            | Self::TransferNotReflected
            | Self::SupplyInvariantViolation
            | Self::ValidationMismatch => Severity::Reported,
        }
    }

    /// Aborts the run when raised
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Where an observed chain id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChainIdSource {
    // eth_chainId / block snapshot
    Node,
    // validateL3Chain() executed by the deployed contract
    Contract,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Wrong chain: expected chain id {expected}, {source_kind} reports {observed}")]
    WrongChain {
        expected: u64,
        observed: u64,
        source_kind: ChainIdSource,
    },

    #[error("Argument mismatch: {0}")]
    ArgumentMismatch(String),

    #[error("Mint failed: {0}")]
    MintFailed(String),

    #[error("Transfer of token {token_id} rejected: {reason}")]
    TransferRejected { token_id: u64, reason: String },

    #[error("Transfer of token {token_id} not reflected: owner is {observed:#x}, expected {expected:#x}")]
    TransferNotReflected {
        token_id: u64,
        expected: Address,
        observed: Address,
    },

    #[error("Transfer of token {token_id} not verified: owner of token unreadable ({reason}), expected {expected:#x}")]
    OwnerUnreadable {
        token_id: u64,
        expected: Address,
        reason: String,
    },

    #[error("Supply invariant violated: totalSupply is {observed}, expected {expected}")]
    SupplyInvariantViolation { expected: u64, observed: u64 },

    #[error("Validation mismatch on '{field}': expected '{expected}', observed '{observed}'")]
    ValidationMismatch {
        field: String,
        expected: String,
        observed: String,
    },

    #[error("No contract deployed in this run")]
    NoDeployment,

    #[error("Invalid run state transition from {from} to {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("Mutating operation refused in state {0}")]
    MutationsHalted(RunState),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Abi(#[from] AbiError),
}

impl HarnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeploymentFailed(_) => ErrorKind::DeploymentFailed,
            Self::WrongChain { .. } => ErrorKind::WrongChainError,
            Self::ArgumentMismatch(_) => ErrorKind::ArgumentMismatch,
            Self::MintFailed(_) => ErrorKind::MintFailed,
            Self::TransferRejected { .. } => ErrorKind::TransferRejected,
            Self::TransferNotReflected { .. } | Self::OwnerUnreadable { .. } => {
                ErrorKind::TransferNotReflected
            }
            Self::SupplyInvariantViolation { .. } => ErrorKind::SupplyInvariantViolation,
            Self::ValidationMismatch { .. } => ErrorKind::ValidationMismatch,
            Self::NoDeployment | Self::InvalidTransition { .. } | Self::MutationsHalted(_) => {
                ErrorKind::InvalidState
            }
            Self::Client(_) | Self::Abi(_) => ErrorKind::ClientFailure,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert!(ErrorKind::DeploymentFailed.is_fatal());
        assert!(ErrorKind::WrongChainError.is_fatal());
        assert!(!ErrorKind::ArgumentMismatch.is_fatal());
        assert_eq!(ErrorKind::ArgumentMismatch.severity(), Severity::CallFatal);
        assert_eq!(ErrorKind::TransferRejected.severity(), Severity::Reported);
        assert_eq!(ErrorKind::ValidationMismatch.severity(), Severity::Reported);
        assert!(Severity::Fatal > Severity::CallFatal);
    }

    #[test]
    fn test_error_kind_mapping() {
        let err = HarnessError::WrongChain {
            expected: 33701,
            observed: 42161,
            source_kind: ChainIdSource::Node,
        };
        assert_eq!(err.kind(), ErrorKind::WrongChainError);
        assert_eq!(
            err.to_string(),
            "Wrong chain: expected chain id 33701, node reports 42161"
        );

        let err: HarnessError = ClientError::Transport("connection refused".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::ClientFailure);
        assert!(!err.is_fatal());

        assert_eq!(ErrorKind::SupplyInvariantViolation.to_string(), "SupplyInvariantViolation");

        // A confirmed transfer whose owner cannot be read back is only reported
        let err = HarnessError::OwnerUnreadable {
            token_id: 1,
            expected: Address::repeat_byte(0x22),
            reason: "execution reverted".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::TransferNotReflected);
        assert_eq!(err.kind().severity(), Severity::Reported);
    }
}
