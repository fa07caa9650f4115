// File: harness/src/report.rs
//
// Aggregated run report and exit policy

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    context::{DeploymentResult, LabeledSnapshot, RunContext, RunState, TokenRecord, Workflow},
    error::Severity,
    outcome::StepOutcome,
};

/// Whether reported (non-fatal) mismatches fail the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExitPolicy {
    #[default]
    FatalOnly,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub workflow: Workflow,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub final_state: RunState,
    pub state_history: Vec<RunState>,
    pub deployment: Option<DeploymentResult>,
    pub baseline_supply: Option<u64>,
    pub tokens: Vec<TokenRecord>,
    pub snapshots: Vec<LabeledSnapshot>,
    pub outcomes: Vec<StepOutcome>,
    /// Completed without any fatal or call-fatal error
    pub success: bool,
}

impl RunReport {
    pub fn from_context(ctx: RunContext) -> Self {
        let parts = ctx.into_parts();
        let success = parts.final_state == RunState::Completed
            && parts
                .outcomes
                .iter()
                .all(|o| o.severity().map_or(true, |s| s == Severity::Reported));

        Self {
            run_id: parts.run_id,
            workflow: parts.workflow,
            started_at: parts.started_at,
            finished_at: Utc::now(),
            final_state: parts.final_state,
            state_history: parts.history,
            deployment: parts.deployment,
            baseline_supply: parts.baseline_supply,
            tokens: parts.tokens,
            snapshots: parts.snapshots,
            outcomes: parts.outcomes,
            success,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.final_state == RunState::Aborted
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    pub fn count_with_severity(&self, severity: Severity) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.severity() == Some(severity))
            .count()
    }

    pub fn passes(&self, policy: ExitPolicy) -> bool {
        match policy {
            ExitPolicy::FatalOnly => self.success,
            ExitPolicy::Strict => self.success && self.failures().next().is_none(),
        }
    }

    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    pub fn log_summary(&self) {
        info!("========================================");
        info!("Run {} ({})", self.run_id, self.workflow);
        info!("Final state: {}", self.final_state);
        if let Some(deployment) = &self.deployment {
            info!("Contract: {:#x}", deployment.contract_address);
        }
        info!(
            "Outcomes: {} total, {} failed ({} fatal, {} call-fatal, {} reported)",
            self.outcomes.len(),
            self.failures().count(),
            self.count_with_severity(Severity::Fatal),
            self.count_with_severity(Severity::CallFatal),
            self.count_with_severity(Severity::Reported)
        );
        for failure in self.failures() {
            warn!(
                "  {}: {}",
                failure.step,
                failure.message.as_deref().unwrap_or("failed")
            );
        }
        info!("Result: {}", if self.success { "PASS" } else { "FAIL" });
        info!("========================================");
    }

    /// Write the report as pretty JSON, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create report directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        let mut file = fs::File::create(path)
            .await
            .context("Failed to create report file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write run report")?;
        file.flush().await.context("Failed to flush report file")?;

        info!("Run report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;

    fn completed_with(outcomes: Vec<StepOutcome>) -> RunReport {
        let mut ctx = RunContext::new(Workflow::Test);
        for state in [
            RunState::Deploying,
            RunState::ChainVerified,
            RunState::Minting,
            RunState::Transferring,
            RunState::Validating,
            RunState::Completed,
        ] {
            ctx.transition(state).unwrap();
        }
        for outcome in outcomes {
            ctx.record(outcome);
        }
        RunReport::from_context(ctx)
    }

    #[test]
    fn test_reported_mismatch_only_fails_strict() {
        let mismatch = HarnessError::SupplyInvariantViolation {
            expected: 4,
            observed: 5,
        };
        let report = completed_with(vec![
            StepOutcome::passed("deploy"),
            StepOutcome::failed("supply_check", &mismatch),
        ]);

        assert!(report.success);
        assert!(report.passes(ExitPolicy::FatalOnly));
        assert!(!report.passes(ExitPolicy::Strict));
        assert_eq!(report.count_with_severity(Severity::Reported), 1);
    }

    #[test]
    fn test_call_fatal_fails_run() {
        let err = HarnessError::ArgumentMismatch("3 recipients, 2 uris".to_string());
        let report = completed_with(vec![StepOutcome::failed("mint_batch", &err)]);

        assert!(!report.success);
        assert!(!report.passes(ExitPolicy::FatalOnly));
    }

    #[test]
    fn test_aborted_run_fails() {
        let mut ctx = RunContext::new(Workflow::Deploy);
        ctx.transition(RunState::Deploying).unwrap();
        ctx.abort();
        let report = RunReport::from_context(ctx);

        assert!(report.is_aborted());
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let report = completed_with(vec![StepOutcome::passed("deploy").with("gasUsed", &1u64)]);

        report.save(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: RunReport = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.outcome("deploy").unwrap().details["gasUsed"], 1);
    }
}
