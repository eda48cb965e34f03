use ethers::types::Address;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{DeploymentPhase, Network};

/// Post-deploy configuration steps, in the order they are applied.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigurationStep {
    CallFee,
    PendingRewards,
    Subsidy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// A transaction was sent and confirmed.
    Applied,
    /// The contract already held the target value; nothing was sent.
    Unchanged,
    NotApplicable,
    Failed { reason: String },
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: ConfigurationStep,
    #[serde(flatten)]
    pub status: StepStatus,
    /// Contracts known to be registered with the subsidy registry once the
    /// step ended, including those registered by earlier runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registered: Vec<Address>,
}

impl StepReport {
    pub fn new(step: ConfigurationStep, status: StepStatus) -> Self {
        Self {
            step,
            status,
            registered: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    #[default]
    Disabled,
    /// Submitted in the background; the outcome is logged, never reported.
    Submitted,
}

/// Summary of one run, printed to the operator and archived in the runs root.
///
/// Addresses are filled in as soon as the corresponding contract is confirmed,
/// so an aborted run still names everything it created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub network: Option<Network>,
    pub deployer: Address,
    pub vault: Option<Address>,
    pub strategy: Option<Address>,
    pub want: Option<Address>,
    /// Pool id for chef strategies, reward pool address otherwise.
    pub pool: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepReport>,
    #[serde(default)]
    pub verification: VerificationState,
    pub phase: DeploymentPhase,
    pub complete: bool,
    /// Vault left without a usable strategy after a failed second deployment.
    pub orphaned_vault: Option<Address>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(network: Option<Network>, deployer: Address) -> Self {
        Self {
            network,
            deployer,
            vault: None,
            strategy: None,
            want: None,
            pool: None,
            steps: Vec::new(),
            verification: VerificationState::Disabled,
            phase: DeploymentPhase::Validating,
            complete: false,
            orphaned_vault: None,
            error: None,
        }
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status.is_failure())
    }

    /// Contracts this run left registered with the subsidy registry.
    pub fn registered_contracts(&self) -> impl Iterator<Item = Address> + '_ {
        self.steps
            .iter()
            .filter(|s| s.step == ConfigurationStep::Subsidy)
            .flat_map(|s| s.registered.iter().copied())
    }

    pub fn is_aborted(&self) -> bool {
        self.phase == DeploymentPhase::Aborted
    }

    /// Marks the run as finished with both contracts deployed.
    pub fn finish(&mut self) {
        self.phase = DeploymentPhase::Done;
        let complete = self.failed_steps().next().is_none();
        self.complete = complete;
    }

    pub fn abort(&mut self, error: impl ToString) {
        self.phase = DeploymentPhase::Aborted;
        self.complete = false;
        self.error = Some(error.to_string());
        if self.vault.is_some() {
            self.orphaned_vault = self.vault;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport::new(Some(Network::Bsc), Address::repeat_byte(0x11))
    }

    #[test]
    fn finish_with_failed_step_is_incomplete() {
        let mut report = report();
        report.vault = Some(Address::repeat_byte(1));
        report.strategy = Some(Address::repeat_byte(2));
        report.steps = vec![
            StepReport::new(ConfigurationStep::CallFee, StepStatus::Unchanged),
            StepReport::new(
                ConfigurationStep::Subsidy,
                StepStatus::Failed {
                    reason: "reverted".into(),
                },
            ),
        ];
        report.finish();
        assert_eq!(report.phase, DeploymentPhase::Done);
        assert!(!report.complete);
        assert_eq!(report.failed_steps().count(), 1);
    }

    #[test]
    fn abort_after_vault_marks_it_orphaned() {
        let mut report = report();
        report.vault = Some(Address::repeat_byte(1));
        report.abort("deployment timed out");
        assert!(report.is_aborted());
        assert_eq!(report.orphaned_vault, Some(Address::repeat_byte(1)));
        assert_eq!(report.error.as_deref(), Some("deployment timed out"));
    }

    #[test]
    fn step_status_serializes_flat() {
        let step = StepReport::new(
            ConfigurationStep::PendingRewards,
            StepStatus::Failed {
                reason: "boom".into(),
            },
        );
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"step": "pending_rewards", "status": "failed", "reason": "boom"})
        );
    }

    #[test]
    fn partial_registration_survives_a_round_trip() {
        let mut report = report();
        report.steps = vec![StepReport {
            step: ConfigurationStep::Subsidy,
            status: StepStatus::Failed {
                reason: "registering strategy failed".into(),
            },
            registered: vec![Address::repeat_byte(1)],
        }];
        report.finish();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.registered_contracts().collect::<Vec<_>>(),
            vec![Address::repeat_byte(1)]
        );
        assert!(!parsed.complete);
    }
}
