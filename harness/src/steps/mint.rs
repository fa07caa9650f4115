// File: harness/src/steps/mint.rs
//
// Mint workflow: single mint, batch mint and supply accounting
//
// Token ids are assigned by the contract. They are read back from the
// Transfer(0x0 -> recipient, id) events of the mint receipt, never computed.

use log::{debug, info, warn};
use orbit_common::{
    abi::ContractCall,
    client::ChainClient,
    contract::{single, NftCall, TransferEvent},
    types::{short_address, Address, TxReceipt},
};

use super::successful_receipt;
use crate::{
    context::{RunContext, TokenRecord},
    error::HarnessError,
    outcome::StepOutcome,
};

pub const MINT_ONE: &str = "mint_one";
pub const MINT_BATCH: &str = "mint_batch";
pub const BASELINE_SUPPLY: &str = "baseline_supply";
pub const SUPPLY_CHECK: &str = "supply_check";

/// Mint one token to `recipient` and return the id assigned by the contract
pub async fn mint_one(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    minter: Address,
    recipient: Address,
    uri: &str,
) -> Result<u64, HarnessError> {
    let result = submit_mint(client, ctx, minter, NftCall::safe_mint(recipient, uri))
        .await
        .and_then(|(receipt, events)| {
            let ids = verify_minted(&events, &[recipient])?;
            Ok((receipt, ids[0]))
        });

    match result {
        Ok((receipt, token_id)) => {
            ctx.add_token(TokenRecord {
                token_id,
                owner: recipient,
                uri: uri.to_owned(),
            });
            info!(
                "Minted token {} to {} (gas used: {})",
                token_id,
                short_address(&recipient),
                receipt.gas_used
            );
            ctx.record(
                StepOutcome::passed(MINT_ONE)
                    .with("tokenId", &token_id)
                    .with("recipient", &recipient)
                    .with("uri", uri)
                    .with("txHash", &receipt.tx_hash)
                    .with("gasUsed", &receipt.gas_used),
            );
            Ok(token_id)
        }
        Err(err) => {
            warn!("Single mint failed: {}", err);
            ctx.record(
                StepOutcome::failed(MINT_ONE, &err)
                    .with("recipient", &recipient)
                    .with("uri", uri),
            );
            Err(err)
        }
    }
}

/// Mint one token per `(recipient, uri)` pair in a single transaction.
///
/// The new ids must form a contiguous increasing range and the n-th id must
/// belong to the n-th recipient.
pub async fn mint_batch(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    minter: Address,
    recipients: &[Address],
    uris: &[String],
) -> Result<Vec<u64>, HarnessError> {
    let result = match check_batch_arguments(recipients, uris) {
        Ok(()) => submit_mint(client, ctx, minter, NftCall::batch_mint(recipients, uris))
            .await
            .and_then(|(receipt, events)| {
                let ids = verify_minted(&events, recipients)?;
                Ok((receipt, ids))
            }),
        Err(err) => Err(err),
    };

    match result {
        Ok((receipt, ids)) => {
            for ((token_id, recipient), uri) in ids.iter().zip(recipients).zip(uris) {
                ctx.add_token(TokenRecord {
                    token_id: *token_id,
                    owner: *recipient,
                    uri: uri.clone(),
                });
            }
            info!(
                "Batch minted {} tokens: {:?} (gas used: {})",
                ids.len(),
                ids,
                receipt.gas_used
            );
            ctx.record(
                StepOutcome::passed(MINT_BATCH)
                    .with("tokenIds", &ids)
                    .with("recipients", recipients)
                    .with("txHash", &receipt.tx_hash)
                    .with("gasUsed", &receipt.gas_used),
            );
            Ok(ids)
        }
        Err(err) => {
            warn!("Batch mint failed: {}", err);
            ctx.record(
                StepOutcome::failed(MINT_BATCH, &err)
                    .with("recipients", &recipients.len())
                    .with("uris", &uris.len()),
            );
            Err(err)
        }
    }
}

/// Read the supply that existed before this run minted anything
pub async fn read_baseline_supply(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
) -> Result<u64, HarnessError> {
    match read_total_supply(client, ctx).await {
        Ok(supply) => {
            ctx.set_baseline_supply(supply);
            ctx.record(StepOutcome::passed(BASELINE_SUPPLY).with("totalSupply", &supply));
            Ok(supply)
        }
        Err(err) => {
            ctx.record(StepOutcome::failed(BASELINE_SUPPLY, &err));
            Err(err)
        }
    }
}

/// Compare `totalSupply` with the baseline plus every token minted in the run.
///
/// Returns `None` when the baseline could not be read and the check was skipped.
pub async fn check_supply(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
) -> Result<Option<u64>, HarnessError> {
    let Some(expected) = ctx.expected_supply() else {
        ctx.record(StepOutcome::skipped(
            SUPPLY_CHECK,
            "baseline supply was not read",
        ));
        return Ok(None);
    };

    let result = read_total_supply(client, ctx).await.and_then(|observed| {
        if observed == expected {
            Ok(observed)
        } else {
            Err(HarnessError::SupplyInvariantViolation { expected, observed })
        }
    });

    match result {
        Ok(supply) => {
            info!("Total supply: {} (expected {})", supply, expected);
            let minted = ctx.token_count();
            ctx.record(
                StepOutcome::passed(SUPPLY_CHECK)
                    .with("totalSupply", &supply)
                    .with("minted", &minted),
            );
            Ok(Some(supply))
        }
        Err(err) => {
            warn!("{}", err);
            ctx.record(StepOutcome::failed(SUPPLY_CHECK, &err));
            Err(err)
        }
    }
}

async fn read_total_supply(client: &dyn ChainClient, ctx: &RunContext) -> Result<u64, HarnessError> {
    let contract = ctx.contract()?;
    let tokens = client
        .read_state(&contract, &NftCall::total_supply())
        .await?;
    Ok(single(tokens)?.into_u64()?)
}

fn check_batch_arguments(recipients: &[Address], uris: &[String]) -> Result<(), HarnessError> {
    if recipients.len() != uris.len() {
        return Err(HarnessError::ArgumentMismatch(format!(
            "{} recipients but {} token URIs",
            recipients.len(),
            uris.len()
        )));
    }
    if recipients.is_empty() {
        return Err(HarnessError::ArgumentMismatch(
            "batch mint needs at least one recipient".to_owned(),
        ));
    }
    Ok(())
}

// Send a mint and return its receipt with the mint events it emitted
async fn submit_mint(
    client: &dyn ChainClient,
    ctx: &RunContext,
    minter: Address,
    call: ContractCall,
) -> Result<(TxReceipt, Vec<TransferEvent>), HarnessError> {
    ctx.ensure_mutable()?;
    let contract = ctx.contract()?;

    debug!("Submitting {} from {}", call, short_address(&minter));
    let outcome = client
        .send_transaction(&minter, &contract, &call)
        .await
        .map_err(|e| HarnessError::MintFailed(e.to_string()))?;
    let receipt = successful_receipt(&outcome)
        .map_err(HarnessError::MintFailed)?
        .clone();

    let events = TransferEvent::collect(&receipt, &contract)?
        .into_iter()
        .filter(TransferEvent::is_mint)
        .collect();
    Ok((receipt, events))
}

/// Check the mint events against the requested recipients and return the ids
pub fn verify_minted(
    events: &[TransferEvent],
    recipients: &[Address],
) -> Result<Vec<u64>, HarnessError> {
    if events.len() != recipients.len() {
        return Err(HarnessError::MintFailed(format!(
            "expected {} minted tokens, receipt reports {}",
            recipients.len(),
            events.len()
        )));
    }

    let mut ids = Vec::with_capacity(events.len());
    for (position, (event, recipient)) in events.iter().zip(recipients).enumerate() {
        if event.to != *recipient {
            return Err(HarnessError::MintFailed(format!(
                "token {} minted to {:#x}, expected {:#x} at position {}",
                event.token_id, event.to, recipient, position
            )));
        }
        if let Some(previous) = ids.last() {
            if event.token_id != previous + 1 {
                return Err(HarnessError::MintFailed(format!(
                    "token ids are not contiguous: {} follows {}",
                    event.token_id, previous
                )));
            }
        }
        ids.push(event.token_id);
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn mint(to: Address, token_id: u64) -> TransferEvent {
        TransferEvent {
            from: Address::zero(),
            to,
            token_id,
        }
    }

    #[test]
    fn test_verify_minted_contiguous() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);

        let ids = verify_minted(&[mint(a, 2), mint(b, 3), mint(a, 4)], &[a, b, a]).unwrap();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_verify_minted_rejects_gaps_and_order() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);

        let gap = verify_minted(&[mint(a, 2), mint(b, 4)], &[a, b]);
        assert_eq!(gap.unwrap_err().kind(), ErrorKind::MintFailed);

        let decreasing = verify_minted(&[mint(a, 3), mint(b, 2)], &[a, b]);
        assert!(decreasing.is_err());

        let swapped = verify_minted(&[mint(b, 2), mint(a, 3)], &[a, b]);
        assert!(swapped.is_err());

        let missing = verify_minted(&[mint(a, 2)], &[a, b]);
        assert!(missing.is_err());
    }

    #[test]
    fn test_batch_arguments() {
        let a = Address::repeat_byte(1);
        let uris = vec!["ipfs://1".to_string(), "ipfs://2".to_string()];

        let err = check_batch_arguments(&[a], &uris).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
        assert!(check_batch_arguments(&[], &[]).is_err());
        assert!(check_batch_arguments(&[a, a], &uris).is_ok());
    }
}
