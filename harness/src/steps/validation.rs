// File: harness/src/steps/validation.rs
//
// Contract metadata validation

use log::{info, warn};
use orbit_common::{
    client::ChainClient,
    contract::{ContractInfo, NftCall},
};

use crate::{
    config::Expectations,
    context::RunContext,
    error::HarnessError,
    outcome::StepOutcome,
};

pub const STEP: &str = "validation";

/// Read `getContractInfo()` once and compare every field with the
/// expectations. Each field yields its own outcome; a mismatch never stops
/// the remaining fields from being checked.
pub async fn validate_metadata(
    client: &dyn ChainClient,
    ctx: &mut RunContext,
    expectations: &Expectations,
) -> Result<ContractInfo, HarnessError> {
    let info = match read_info(client, ctx).await {
        Ok(info) => info,
        Err(err) => {
            warn!("Could not read contract info: {}", err);
            ctx.record(StepOutcome::failed(STEP, &err));
            return Err(err);
        }
    };

    info!("Contract info:");
    info!("  Name:         {}", info.name);
    info!("  Symbol:       {}", info.symbol);
    info!("  Total supply: {}", info.total_supply);
    info!("  Version:      {}", info.version);
    info!("  Chain name:   {}", info.chain_name);
    info!("  Chain id:     {}", info.chain_id);

    let mut checks = vec![
        ("name", expectations.name.clone(), info.name.clone()),
        ("symbol", expectations.symbol.clone(), info.symbol.clone()),
        ("version", expectations.version.clone(), info.version.clone()),
        (
            "chainName",
            expectations.chain_name.clone(),
            info.chain_name.clone(),
        ),
        (
            "chainId",
            expectations.chain_id.to_string(),
            info.chain_id.to_string(),
        ),
    ];
    // Supply is only asserted when the pre-run supply is known
    if let Some(expected_supply) = ctx.expected_supply() {
        checks.push((
            "totalSupply",
            expected_supply.to_string(),
            info.total_supply.to_string(),
        ));
    }

    for (field, expected, observed) in checks {
        ctx.record(compare_field(field, expected, observed));
    }

    Ok(info)
}

async fn read_info(client: &dyn ChainClient, ctx: &RunContext) -> Result<ContractInfo, HarnessError> {
    let contract = ctx.contract()?;
    let tokens = client
        .read_state(&contract, &NftCall::get_contract_info())
        .await?;
    Ok(ContractInfo::from_tokens(tokens)?)
}

fn compare_field(field: &str, expected: String, observed: String) -> StepOutcome {
    let step = format!("{STEP}.{field}");
    if expected == observed {
        return StepOutcome::passed(step).with("value", &observed);
    }

    let err = HarnessError::ValidationMismatch {
        field: field.to_owned(),
        expected,
        observed,
    };
    warn!("{}", err);
    StepOutcome::failed(step, &err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_compare_field() {
        let ok = compare_field("symbol", "BVNFT".to_string(), "BVNFT".to_string());
        assert!(ok.success);
        assert_eq!(ok.step, "validation.symbol");

        let mismatch = compare_field("chainId", "33701".to_string(), "42161".to_string());
        assert!(!mismatch.success);
        assert_eq!(mismatch.error, Some(ErrorKind::ValidationMismatch));
        assert_eq!(mismatch.details["expected"], "33701");
        assert_eq!(mismatch.details["observed"], "42161");
    }
}
