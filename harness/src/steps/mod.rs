// File: harness/src/steps/mod.rs
//
// Workflow steps
//
// Each step takes the chain client and the run context, performs its chain
// operations, records one or more StepOutcome entries in the context and
// returns its typed result to the orchestrator.

pub mod chain_check;
pub mod deployment;
pub mod mint;
pub mod transfer;
pub mod validation;

use orbit_common::{client::TxOutcome, types::TxReceipt};

/// Receipt of a transaction that was included and did not revert
pub(crate) fn successful_receipt(outcome: &TxOutcome) -> Result<&TxReceipt, String> {
    match &outcome.receipt {
        _ if !outcome.confirmed => Err(format!(
            "transaction {:#x} not included within the inclusion bound",
            outcome.tx_hash
        )),
        Some(receipt) if receipt.status => Ok(receipt),
        Some(receipt) => Err(format!(
            "transaction {:#x} reverted in block {}",
            receipt.tx_hash, receipt.block_number
        )),
        None => Err(format!("no receipt for transaction {:#x}", outcome.tx_hash)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_common::types::H256;

    #[test]
    fn test_successful_receipt_reasons() {
        let pending = TxOutcome::pending(H256::repeat_byte(1));
        assert!(successful_receipt(&pending)
            .unwrap_err()
            .contains("not included"));

        let reverted = TxOutcome::included(TxReceipt {
            tx_hash: H256::repeat_byte(2),
            block_number: 9,
            gas_used: 30_000,
            status: false,
            contract_address: None,
            logs: Vec::new(),
        });
        assert!(successful_receipt(&reverted)
            .unwrap_err()
            .contains("reverted in block 9"));
    }
}
