// File: harness/src/context.rs
//
// Run context
//
// One `RunContext` is created per run and passed explicitly through every
// step. It owns the run state machine, the deployment, the token records,
// the block snapshots and the accumulated step outcomes.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, error};
use orbit_common::types::{Address, BlockSnapshot, TxHash};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{error::HarnessError, outcome::StepOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum RunState {
    Idle,
    Deploying,
    ChainVerified,
    ChainRejected,
    Minting,
    Transferring,
    Validating,
    Completed,
    Aborted,
}

impl RunState {
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Deploying)
                | (Deploying, ChainVerified)
                | (Deploying, ChainRejected)
                | (Deploying, Aborted)
                | (ChainRejected, Aborted)
                | (ChainVerified, Minting)
                // The deploy workflow validates right after the gate
                | (ChainVerified, Validating)
                | (Minting, Transferring)
                | (Minting, Aborted)
                | (Transferring, Validating)
                | (Transferring, Aborted)
                | (Validating, Completed)
                | (Validating, Aborted)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }

    pub fn allows_mutations(&self) -> bool {
        matches!(
            self,
            RunState::Deploying | RunState::Minting | RunState::Transferring
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    Deploy,
    Test,
}

/// Created once per run, never modified afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub contract_address: Address,
    pub deployer_address: Address,
    pub admin_address: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token_id: u64,
    pub owner: Address,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSnapshot {
    pub label: String,
    pub snapshot: BlockSnapshot,
}

pub struct RunContext {
    run_id: String,
    workflow: Workflow,
    started_at: DateTime<Utc>,
    state: RunState,
    history: Vec<RunState>,
    deployment: Option<DeploymentResult>,
    tokens: IndexMap<u64, TokenRecord>,
    baseline_supply: Option<u64>,
    snapshots: Vec<LabeledSnapshot>,
    outcomes: Vec<StepOutcome>,
}

impl RunContext {
    pub fn new(workflow: Workflow) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!("{}-{}", workflow, started_at.format("%Y%m%d_%H%M%S%3f")),
            workflow,
            started_at,
            state: RunState::Idle,
            history: vec![RunState::Idle],
            deployment: None,
            tokens: IndexMap::new(),
            baseline_supply: None,
            snapshots: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn transition(&mut self, next: RunState) -> Result<(), HarnessError> {
        if !self.state.can_transition_to(next) {
            return Err(HarnessError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!("Run {}: {} -> {}", self.run_id, self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Fatal errors land here from any non-terminal state
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        error!("Run {} aborted in state {}", self.run_id, self.state);
        self.state = RunState::Aborted;
        self.history.push(RunState::Aborted);
    }

    /// Every mutating step calls this before touching the chain
    pub fn ensure_mutable(&self) -> Result<(), HarnessError> {
        if self.state.allows_mutations() {
            Ok(())
        } else {
            Err(HarnessError::MutationsHalted(self.state))
        }
    }

    pub fn record(&mut self, outcome: StepOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    pub fn deployment(&self) -> Option<&DeploymentResult> {
        self.deployment.as_ref()
    }

    pub fn set_deployment(&mut self, deployment: DeploymentResult) -> Result<(), HarnessError> {
        if self.deployment.is_some() {
            return Err(HarnessError::DeploymentFailed(
                "a contract was already deployed in this run".to_owned(),
            ));
        }
        self.deployment = Some(deployment);
        Ok(())
    }

    pub fn contract(&self) -> Result<Address, HarnessError> {
        self.deployment
            .as_ref()
            .map(|d| d.contract_address)
            .ok_or(HarnessError::NoDeployment)
    }

    pub fn add_token(&mut self, record: TokenRecord) {
        self.tokens.insert(record.token_id, record);
    }

    pub fn token(&self, token_id: u64) -> Option<&TokenRecord> {
        self.tokens.get(&token_id)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenRecord> {
        self.tokens.values()
    }

    pub fn token_count(&self) -> u64 {
        self.tokens.len() as u64
    }

    pub fn set_owner(&mut self, token_id: u64, owner: Address) {
        if let Some(record) = self.tokens.get_mut(&token_id) {
            record.owner = owner;
        }
    }

    pub fn baseline_supply(&self) -> Option<u64> {
        self.baseline_supply
    }

    pub fn set_baseline_supply(&mut self, supply: u64) {
        self.baseline_supply = Some(supply);
    }

    /// Supply the contract should report given what this run minted
    pub fn expected_supply(&self) -> Option<u64> {
        self.baseline_supply
            .map(|baseline| baseline + self.token_count())
    }

    pub fn add_snapshot(&mut self, label: impl Into<String>, snapshot: BlockSnapshot) {
        self.snapshots.push(LabeledSnapshot {
            label: label.into(),
            snapshot,
        });
    }

    pub fn last_snapshot(&self) -> Option<&LabeledSnapshot> {
        self.snapshots.last()
    }

    pub(crate) fn into_parts(self) -> RunParts {
        RunParts {
            run_id: self.run_id,
            workflow: self.workflow,
            started_at: self.started_at,
            final_state: self.state,
            history: self.history,
            deployment: self.deployment,
            tokens: self.tokens.into_values().collect(),
            baseline_supply: self.baseline_supply,
            snapshots: self.snapshots,
            outcomes: self.outcomes,
        }
    }
}

pub(crate) struct RunParts {
    pub run_id: String,
    pub workflow: Workflow,
    pub started_at: DateTime<Utc>,
    pub final_state: RunState,
    pub history: Vec<RunState>,
    pub deployment: Option<DeploymentResult>,
    pub tokens: Vec<TokenRecord>,
    pub baseline_supply: Option<u64>,
    pub snapshots: Vec<LabeledSnapshot>,
    pub outcomes: Vec<StepOutcome>,
}
