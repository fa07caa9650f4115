// File: harness/src/steps/transfer.rs
//
// Transfer workflow and token audit

use futures::future::join_all;
use log::{debug, info, warn};
use orbit_common::{
    client::ChainClient,
    contract::{single, NftCall},
    types::{short_address, Address},
};

use super::successful_receipt;
use crate::{
    context::{RunContext, TokenRecord},
    error::HarnessError,
    outcome::StepOutcome,
};

pub const TRANSFER: &str = "transfer";
pub const TOKEN_AUDIT: &str = "token_audit";

/// Transfer a token of this run from its recorded owner to `recipient`,
/// submitted by `sender`, then read the owner back.
pub async fn transfer_token(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    token_id: u64,
    sender: Address,
    recipient: Address,
) -> Result<(), HarnessError> {
    let result = try_transfer(client, ctx, token_id, sender, recipient).await;
    match result {
        Ok(outcome) => {
            ctx.set_owner(token_id, recipient);
            ctx.record(outcome);
            Ok(())
        }
        Err(err) => {
            warn!("{}", err);
            // The receipt confirmed the transfer even though the owner read did not
            if matches!(err, HarnessError::OwnerUnreadable { .. }) {
                ctx.set_owner(token_id, recipient);
            }
            ctx.record(
                StepOutcome::failed(TRANSFER, &err)
                    .with("sender", &sender)
                    .with("to", &recipient),
            );
            Err(err)
        }
    }
}

async fn try_transfer(
    client: &dyn ChainClient,
    ctx: &RunContext,
    token_id: u64,
    sender: Address,
    recipient: Address,
) -> Result<StepOutcome, HarnessError> {
    ctx.ensure_mutable()?;
    let contract = ctx.contract()?;
    let from = ctx
        .token(token_id)
        .map(|record| record.owner)
        .ok_or_else(|| HarnessError::TransferRejected {
            token_id,
            reason: "token was not minted in this run".to_owned(),
        })?;

    info!(
        "Transferring token {} from {} to {} (sender {})",
        token_id,
        short_address(&from),
        short_address(&recipient),
        short_address(&sender)
    );

    let call = NftCall::transfer_from(from, recipient, token_id);
    let outcome = client
        .send_transaction(&sender, &contract, &call)
        .await
        .map_err(|e| HarnessError::TransferRejected {
            token_id,
            reason: e.to_string(),
        })?;
    let receipt = successful_receipt(&outcome)
        .map_err(|reason| HarnessError::TransferRejected { token_id, reason })?;

    // Only read once the transfer is confirmed
    let owner = read_owner(client, &contract, token_id)
        .await
        .map_err(|e| HarnessError::OwnerUnreadable {
            token_id,
            expected: recipient,
            reason: e.to_string(),
        })?;
    if owner != recipient {
        return Err(HarnessError::TransferNotReflected {
            token_id,
            expected: recipient,
            observed: owner,
        });
    }

    info!(
        "Token {} now owned by {} (gas used: {})",
        token_id,
        short_address(&owner),
        receipt.gas_used
    );

    Ok(StepOutcome::passed(TRANSFER)
        .with("tokenId", &token_id)
        .with("from", &from)
        .with("to", &recipient)
        .with("sender", &sender)
        .with("txHash", &receipt.tx_hash)
        .with("gasUsed", &receipt.gas_used))
}

async fn read_owner(
    client: &dyn ChainClient,
    contract: &Address,
    token_id: u64,
) -> Result<Address, HarnessError> {
    let tokens = client
        .read_state(contract, &NftCall::owner_of(token_id))
        .await?;
    Ok(single(tokens)?.into_address()?)
}

async fn read_uri(
    client: &dyn ChainClient,
    contract: &Address,
    token_id: u64,
) -> Result<String, HarnessError> {
    let tokens = client
        .read_state(contract, &NftCall::token_uri(token_id))
        .await?;
    Ok(single(tokens)?.into_string()?)
}

// Compare one token record with what the contract reports
fn audit_record(
    record: &TokenRecord,
    owner: Result<Address, HarnessError>,
    uri: Result<String, HarnessError>,
) -> Vec<HarnessError> {
    let mut mismatches = Vec::new();

    match owner {
        Ok(owner) if owner == record.owner => {}
        observed => mismatches.push(HarnessError::ValidationMismatch {
            field: format!("owner[{}]", record.token_id),
            expected: format!("{:#x}", record.owner),
            observed: match observed {
                Ok(owner) => format!("{:#x}", owner),
                Err(e) => format!("read failed: {e}"),
            },
        }),
    }

    match uri {
        Ok(uri) if uri == record.uri => {}
        observed => mismatches.push(HarnessError::ValidationMismatch {
            field: format!("tokenURI[{}]", record.token_id),
            expected: record.uri.clone(),
            observed: observed.unwrap_or_else(|e| format!("read failed: {e}")),
        }),
    }

    mismatches
}

/// Read back every token of the run concurrently and compare owner and URI
/// with the records. Returns the number of mismatches.
pub async fn audit_tokens(client: &dyn ChainClient, ctx: &mut RunContext) -> usize {
    let contract = match ctx.contract() {
        Ok(contract) => contract,
        Err(err) => {
            ctx.record(StepOutcome::failed(TOKEN_AUDIT, &err));
            return 0;
        }
    };

    let records: Vec<TokenRecord> = ctx.tokens().cloned().collect();
    let reads = records.iter().map(|record| async move {
        let (owner, uri) = futures::join!(
            read_owner(client, &contract, record.token_id),
            read_uri(client, &contract, record.token_id)
        );
        if log::log_enabled!(log::Level::Debug) {
            debug!("Token {}: owner {:?}, uri {:?}", record.token_id, owner, uri);
        }
        audit_record(record, owner, uri)
    });

    let mismatches: Vec<HarnessError> = join_all(reads).await.into_iter().flatten().collect();
    let count = mismatches.len();

    if mismatches.is_empty() {
        info!("Audited {} tokens, all records match", records.len());
        ctx.record(
            StepOutcome::passed(TOKEN_AUDIT)
                .with("tokens", &records.len())
                .with("tokenIds", &records.iter().map(|r| r.token_id).collect::<Vec<_>>()),
        );
    } else {
        for err in mismatches {
            warn!("{}", err);
            ctx.record(StepOutcome::failed(TOKEN_AUDIT, &err));
        }
    }

    count
}
