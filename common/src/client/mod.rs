// File: common/src/client/mod.rs
//
// Chain client abstraction
//
// Everything the harness needs from a chain goes through `ChainClient`. The
// JSON-RPC implementation talks to a real node; the harness ships an
// in-process simulated chain implementing the same trait.

#[cfg(feature = "rpc-client")]
pub mod rpc;

#[cfg(feature = "rpc-client")]
pub use rpc::RpcChainClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    abi::{ContractCall, Token},
    error::ClientError,
    types::{Address, BlockSnapshot, TxHash, TxReceipt, U256},
};

/// Result of a state-changing transaction.
///
/// `confirmed` is true once the inclusion wait returned a receipt. A
/// confirmed transaction may still have reverted: check `succeeded()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub receipt: Option<TxReceipt>,
    pub confirmed: bool,
}

impl TxOutcome {
    pub fn included(receipt: TxReceipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            receipt: Some(receipt),
            confirmed: true,
        }
    }

    pub fn pending(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            receipt: None,
            confirmed: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.confirmed && self.receipt.as_ref().is_some_and(|r| r.status)
    }

    pub fn gas_used(&self) -> Option<u64> {
        self.receipt.as_ref().map(|r| r.gas_used)
    }
}

/// Result of a contract-creation transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Known only once the creation receipt is available
    pub address: Option<Address>,
    pub outcome: TxOutcome,
}

impl Deployment {
    pub fn confirmed(&self) -> bool {
        self.outcome.confirmed
    }

    /// Address of a successfully created contract
    pub fn created_address(&self) -> Option<Address> {
        if self.outcome.succeeded() {
            self.address.filter(|a| !a.is_zero())
        } else {
            None
        }
    }
}

/// Operations the harness consumes from a chain.
///
/// Mutating operations (`deploy_contract`, `send_transaction`) wait for
/// inclusion up to the client's configured bound before returning.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the node
    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// Accounts the client can sign for, in a stable order
    async fn get_signer_identities(&self) -> Result<Vec<Address>, ClientError>;

    /// Native balance in wei
    async fn get_balance(&self, address: &Address) -> Result<U256, ClientError>;

    /// Facts about the latest block
    async fn get_block_snapshot(&self) -> Result<BlockSnapshot, ClientError>;

    /// Submit a contract creation and wait for its inclusion
    async fn deploy_contract(
        &self,
        from: &Address,
        bytecode: &[u8],
        constructor_args: &[u8],
    ) -> Result<Deployment, ClientError>;

    /// Submit a contract call as a transaction and wait for its inclusion
    async fn send_transaction(
        &self,
        from: &Address,
        target: &Address,
        call: &ContractCall,
    ) -> Result<TxOutcome, ClientError>;

    /// Execute a read-only call against the latest state
    async fn read_state(
        &self,
        target: &Address,
        call: &ContractCall,
    ) -> Result<Vec<Token>, ClientError>;
}
