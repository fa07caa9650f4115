//! Workflow orchestration
//!
//! The orchestrator drives one run through the state machine:
//!
//! ```text
//! Idle -> Deploying -> ChainVerified -> Minting -> Transferring -> Validating -> Completed
//!                   \-> ChainRejected -> Aborted
//! ```
//!
//! The chain id is checked against the node before the contract is deployed,
//! again once it is deployed (node and contract view) and a last time after
//! the mutating sequence.
//!
//! Errors of fatal severity abort the run. Call-fatal and reported errors are
//! recorded by the step that raised them and the sequence goes on.
//!
//! # Example
//!
//! ```rust,ignore
//! use orbit_harness::{orchestrator::Orchestrator, simulator::{SimulatedL3, DEMO_BYTECODE}};
//!
//! let artifact = ContractArtifact {
//!     contract_name: "BunkerverseNFT".to_string(),
//!     bytecode: DEMO_BYTECODE.to_vec(),
//! };
//! let orchestrator = Orchestrator::new(Arc::new(SimulatedL3::default()));
//! let report = orchestrator.run_full(&artifact).await;
//! assert!(report.success);
//! ```

use log::{error, info};
use orbit_common::{
    client::ChainClient,
    contract::ContractArtifact,
    types::{short_address, Address},
};
use std::sync::Arc;

use crate::{
    config::{DemoMints, Expectations},
    context::{RunContext, RunState, Workflow},
    error::HarnessError,
    outcome::StepOutcome,
    report::RunReport,
    steps::{chain_check, deployment, mint, transfer, validation},
};

/// Signers needed by the full workflow: deployer, first and second user
const FULL_WORKFLOW_SIGNERS: usize = 3;

pub struct Orchestrator {
    client: Arc<dyn ChainClient>,
    expectations: Expectations,
    demo_mints: DemoMints,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            expectations: Expectations::default(),
            demo_mints: DemoMints::default(),
        }
    }

    pub fn with_expectations(mut self, expectations: Expectations) -> Self {
        self.expectations = expectations;
        self
    }

    pub fn with_demo_mints(mut self, demo_mints: DemoMints) -> Self {
        self.demo_mints = demo_mints;
        self
    }

    pub fn expectations(&self) -> &Expectations {
        &self.expectations
    }

    /// Deploy, pass the L3 gate, then validate the contract metadata
    pub async fn run_deploy(&self, artifact: &ContractArtifact) -> RunReport {
        let mut ctx = RunContext::new(Workflow::Deploy);
        info!("Starting deploy run {}", ctx.run_id());

        if let Err(err) = self.execute_deploy(&mut ctx, artifact).await {
            error!("Run {} stopped: {}", ctx.run_id(), err);
            ctx.abort();
        }

        RunReport::from_context(ctx)
    }

    /// Full test sequence: deploy, gate, single and batch mint, supply check,
    /// transfer, token audit, second L3 check and metadata validation
    pub async fn run_full(&self, artifact: &ContractArtifact) -> RunReport {
        let mut ctx = RunContext::new(Workflow::Test);
        info!("Starting test run {}", ctx.run_id());

        if let Err(err) = self.execute_full(&mut ctx, artifact).await {
            error!("Run {} stopped: {}", ctx.run_id(), err);
            ctx.abort();
        }

        RunReport::from_context(ctx)
    }

    async fn execute_deploy(
        &self,
        ctx: &mut RunContext,
        artifact: &ContractArtifact,
    ) -> Result<(), HarnessError> {
        let signers = self.start(ctx, 1).await?;
        self.deploy_and_verify(ctx, artifact, signers[0]).await?;

        ctx.transition(RunState::Validating)?;
        tolerate(validation::validate_metadata(self.client(), ctx, &self.expectations).await)?;

        ctx.transition(RunState::Completed)
    }

    async fn execute_full(
        &self,
        ctx: &mut RunContext,
        artifact: &ContractArtifact,
    ) -> Result<(), HarnessError> {
        let signers = self.start(ctx, FULL_WORKFLOW_SIGNERS).await?;
        let (deployer, user1, user2) = (signers[0], signers[1], signers[2]);
        info!(
            "Signers: deployer {}, user1 {}, user2 {}",
            short_address(&deployer),
            short_address(&user1),
            short_address(&user2)
        );

        self.deploy_and_verify(ctx, artifact, deployer).await?;
        let client = self.client();

        ctx.transition(RunState::Minting)?;
        info!("--- Minting ---");
        tolerate(mint::read_baseline_supply(client, ctx).await)?;
        let single = tolerate(
            mint::mint_one(client, ctx, deployer, user1, &self.demo_mints.single_uri).await,
        )?;
        tolerate(
            mint::mint_batch(
                client,
                ctx,
                deployer,
                &[user1, user2, deployer],
                &self.demo_mints.batch_uris,
            )
            .await,
        )?;
        tolerate(mint::check_supply(client, ctx).await)?;

        ctx.transition(RunState::Transferring)?;
        info!("--- Transferring ---");
        match single {
            Some(token_id) => {
                tolerate(transfer::transfer_token(client, ctx, token_id, user1, user2).await)?;
            }
            None => ctx.record(StepOutcome::skipped(
                transfer::TRANSFER,
                "the single mint produced no token",
            )),
        }
        transfer::audit_tokens(client, ctx).await;

        ctx.transition(RunState::Validating)?;
        info!("--- Validating ---");
        chain_check::check_l3(client, ctx, &self.expectations, chain_check::POST_SEQUENCE).await?;
        tolerate(validation::validate_metadata(client, ctx, &self.expectations).await)?;

        ctx.transition(RunState::Completed)
    }

    // Enter Deploying and fetch the signers the workflow needs
    async fn start(
        &self,
        ctx: &mut RunContext,
        needed: usize,
    ) -> Result<Vec<Address>, HarnessError> {
        ctx.transition(RunState::Deploying)?;

        let signers = self
            .client
            .get_signer_identities()
            .await
            .map_err(|e| HarnessError::DeploymentFailed(format!("cannot list signers: {e}")))
            .and_then(|signers| {
                if signers.len() < needed {
                    Err(HarnessError::DeploymentFailed(format!(
                        "{} signer identities needed, client offers {}",
                        needed,
                        signers.len()
                    )))
                } else {
                    Ok(signers)
                }
            });

        if let Err(err) = &signers {
            ctx.record(StepOutcome::failed(deployment::STEP, err));
        }
        signers
    }

    // Gate on the node before deploying, deploy with the deployer as admin,
    // then gate again with the contract's own view of the chain
    async fn deploy_and_verify(
        &self,
        ctx: &mut RunContext,
        artifact: &ContractArtifact,
        deployer: Address,
    ) -> Result<(), HarnessError> {
        self.gate(ctx, chain_check::PRE_DEPLOY).await?;

        info!("--- Deploying ---");
        deployment::deploy(self.client(), ctx, artifact, deployer, deployer).await?;

        self.gate(ctx, chain_check::POST_DEPLOY).await?;
        ctx.transition(RunState::ChainVerified)
    }

    async fn gate(&self, ctx: &mut RunContext, label: &str) -> Result<(), HarnessError> {
        match chain_check::check_l3(self.client(), ctx, &self.expectations, label).await {
            Ok(_) => Ok(()),
            Err(err) => {
                ctx.transition(RunState::ChainRejected)?;
                Err(err)
            }
        }
    }

    fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }
}

// Steps have already recorded their outcome; only fatal errors stop the run
fn tolerate<T>(result: Result<T, HarnessError>) -> Result<Option<T>, HarnessError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(_) => Ok(None),
    }
}
