// File: harness/src/steps/deployment.rs
//
// Contract deployment

use log::{info, warn};
use orbit_common::{
    client::ChainClient,
    contract::{encode_constructor_args, ContractArtifact},
    types::{short_address, Address, U256},
};

use super::successful_receipt;
use crate::{
    context::{DeploymentResult, RunContext},
    error::HarnessError,
    outcome::StepOutcome,
};

pub const STEP: &str = "deploy";

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

// Ether amount with 6 decimals, enough for log lines and the report
pub fn format_ether(wei: U256) -> String {
    let unit = U256::from(WEI_PER_ETHER);
    let whole = wei / unit;
    let micro = (wei % unit) / U256::from(1_000_000_000_000u64);
    format!("{}.{:06}", whole, micro.low_u64())
}

/// Deploy the contract from `deployer` with `admin` as its constructor
/// argument and wait for the creation to be confirmed
pub async fn deploy(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    artifact: &ContractArtifact,
    deployer: Address,
    admin: Address,
) -> Result<DeploymentResult, HarnessError> {
    match try_deploy(client, ctx, artifact, deployer, admin).await {
        Ok((result, outcome)) => {
            ctx.record(outcome);
            Ok(result)
        }
        Err(err) => {
            ctx.record(
                StepOutcome::failed(STEP, &err)
                    .with("deployer", &deployer)
                    .with("admin", &admin),
            );
            Err(err)
        }
    }
}

async fn try_deploy(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    artifact: &ContractArtifact,
    deployer: Address,
    admin: Address,
) -> Result<(DeploymentResult, StepOutcome), HarnessError> {
    ctx.ensure_mutable()?;

    info!(
        "Deploying {} from {} (admin {})",
        artifact.contract_name,
        short_address(&deployer),
        short_address(&admin)
    );

    // The balance is informational: a node that cannot report it can still deploy
    let balance = match client.get_balance(&deployer).await {
        Ok(balance) => {
            info!("Deployer balance: {} ETH", format_ether(balance));
            Some(balance)
        }
        Err(e) => {
            warn!("Could not read deployer balance: {}", e);
            None
        }
    };

    let deployment = client
        .deploy_contract(
            &deployer,
            &artifact.bytecode,
            &encode_constructor_args(admin),
        )
        .await
        .map_err(|e| HarnessError::DeploymentFailed(e.to_string()))?;

    let receipt = successful_receipt(&deployment.outcome)
        .map_err(HarnessError::DeploymentFailed)?
        .clone();
    let contract_address = deployment.created_address().ok_or_else(|| {
        HarnessError::DeploymentFailed("receipt carries no contract address".to_owned())
    })?;

    let result = DeploymentResult {
        contract_address,
        deployer_address: deployer,
        admin_address: admin,
        tx_hash: receipt.tx_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
    };
    ctx.set_deployment(result.clone())?;

    info!(
        "{} deployed at {:#x} in block {} (gas used: {})",
        artifact.contract_name, contract_address, receipt.block_number, receipt.gas_used
    );

    let mut outcome = StepOutcome::passed(STEP)
        .with("contract", &contract_address)
        .with("deployer", &deployer)
        .with("admin", &admin)
        .with("txHash", &receipt.tx_hash)
        .with("blockNumber", &receipt.block_number)
        .with("gasUsed", &receipt.gas_used);
    if let Some(balance) = balance {
        outcome.insert("deployerBalanceEth", &format_ether(balance));
    }

    Ok((result, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::zero()), "0.000000");
        assert_eq!(
            format_ether(U256::from(WEI_PER_ETHER) * U256::from(10_000u64)),
            "10000.000000"
        );
        assert_eq!(
            format_ether(U256::from(1_500_000_000_000_000_000u64)),
            "1.500000"
        );
    }
}
