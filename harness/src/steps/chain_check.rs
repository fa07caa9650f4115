// File: harness/src/steps/chain_check.rs
//
// L3 characteristic check
//
// This is the gate of the workflow: a chain id other than the expected one
// raises WrongChainError and the orchestrator stops issuing mutations.

use log::{info, warn};
use orbit_common::{
    client::ChainClient,
    contract::{L3ChainView, NftCall},
    types::{Address, BlockSnapshot},
};

use crate::{
    config::Expectations,
    context::RunContext,
    error::{ChainIdSource, HarnessError},
    outcome::StepOutcome,
};

pub const STEP: &str = "l3_check";

pub const PRE_DEPLOY: &str = "pre_deploy";
pub const POST_DEPLOY: &str = "post_deploy";
pub const POST_SEQUENCE: &str = "post_sequence";

pub fn step_name(label: &str) -> String {
    format!("{STEP}.{label}")
}

/// Read the latest block and assert the chain is the expected L3.
///
/// When a contract is deployed its own view of the chain (`validateL3Chain`)
/// is read concurrently and must agree with the node. The snapshot is kept in
/// the context even when the check fails.
pub async fn check_l3(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    expectations: &Expectations,
    label: &str,
) -> Result<BlockSnapshot, HarnessError> {
    let step = step_name(label);
    let contract = ctx.deployment().map(|d| d.contract_address);

    let (snapshot, contract_view) = read_views(client, contract).await;
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(err) => {
            ctx.record(StepOutcome::failed(&step, &err));
            return Err(err);
        }
    };

    let mut outcome = StepOutcome::passed(&step)
        .with("chainId", &snapshot.chain_id)
        .with("blockNumber", &snapshot.block_number)
        .with("timestamp", &snapshot.timestamp)
        .with("coinbase", &snapshot.coinbase)
        .with("gasLimit", &snapshot.gas_limit);

    // Cadence since the previous validation point
    if let Some(previous) = ctx.last_snapshot() {
        let blocks = snapshot
            .block_number
            .saturating_sub(previous.snapshot.block_number);
        let seconds = snapshot
            .timestamp
            .saturating_sub(previous.snapshot.timestamp);
        info!(
            "{} blocks in {}s since {}",
            blocks, seconds, previous.label
        );
        outcome.insert("since", &previous.label);
        outcome.insert("blocksElapsed", &blocks);
        outcome.insert("secondsElapsed", &seconds);
    }
    ctx.add_snapshot(label, snapshot.clone());

    let verdict = verify(&snapshot, contract_view, expectations.chain_id, &mut outcome);
    if let Err(err) = verdict {
        let mut failed = StepOutcome::failed(&step, &err);
        for (key, value) in outcome.details {
            failed.details.entry(key).or_insert(value);
        }
        ctx.record(failed);
        return Err(err);
    }

    info!(
        "L3 chain verified ({}): chain id {}, block {}, gas limit {}",
        label, snapshot.chain_id, snapshot.block_number, snapshot.gas_limit
    );
    ctx.record(outcome);

    if let Some(min_gas_limit) = expectations.min_gas_limit {
        ctx.record(check_gas_floor(&step, &snapshot, min_gas_limit));
    }

    Ok(snapshot)
}

async fn read_views(
    client: &dyn ChainClient,
    contract: Option<Address>,
) -> (
    Result<BlockSnapshot, HarnessError>,
    Option<Result<L3ChainView, HarnessError>>,
) {
    match contract {
        Some(contract) => {
            let call = NftCall::validate_l3_chain();
            let (snapshot, view) = futures::join!(
                client.get_block_snapshot(),
                client.read_state(&contract, &call)
            );
            let view = view
                .map_err(HarnessError::from)
                .and_then(|tokens| L3ChainView::from_tokens(tokens).map_err(HarnessError::from));
            (snapshot.map_err(HarnessError::from), Some(view))
        }
        None => (
            client
                .get_block_snapshot()
                .await
                .map_err(HarnessError::from),
            None,
        ),
    }
}

fn verify(
    snapshot: &BlockSnapshot,
    contract_view: Option<Result<L3ChainView, HarnessError>>,
    expected: u64,
    outcome: &mut StepOutcome,
) -> Result<(), HarnessError> {
    if snapshot.chain_id != expected {
        warn!(
            "Node reports chain id {}, expected {}",
            snapshot.chain_id, expected
        );
        return Err(HarnessError::WrongChain {
            expected,
            observed: snapshot.chain_id,
            source_kind: ChainIdSource::Node,
        });
    }

    match contract_view {
        Some(Ok(view)) => {
            outcome.insert("contractChainId", &view.chain_id);
            outcome.insert("contractBlockNumber", &view.block_number);
            if view.chain_id != expected {
                warn!(
                    "Contract observes chain id {}, node reports {}",
                    view.chain_id, snapshot.chain_id
                );
                return Err(HarnessError::WrongChain {
                    expected,
                    observed: view.chain_id,
                    source_kind: ChainIdSource::Contract,
                });
            }
        }
        Some(Err(err)) => {
            // The node-side check already passed
            warn!("Could not read validateL3Chain(): {}", err);
            outcome.insert("contractView", &format!("unavailable: {err}"));
        }
        None => {}
    }

    Ok(())
}

fn check_gas_floor(step: &str, snapshot: &BlockSnapshot, min_gas_limit: u64) -> StepOutcome {
    let step = format!("{step}.gas_limit");
    if snapshot.gas_limit >= min_gas_limit {
        return StepOutcome::passed(step)
            .with("gasLimit", &snapshot.gas_limit)
            .with("minimum", &min_gas_limit);
    }

    let err = HarnessError::ValidationMismatch {
        field: "gasLimit".to_owned(),
        expected: format!(">= {min_gas_limit}"),
        observed: snapshot.gas_limit.to_string(),
    };
    warn!("{}", err);
    StepOutcome::failed(step, &err)
}
