use serde::{Deserialize, Serialize};
use strum::Display;

/// States of a single deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    #[default]
    Validating,
    PredictingAddresses,
    DeployingA,
    DeployingB,
    Configuring,
    Verifying,
    Done,
    Aborted,
}

impl DeploymentPhase {
    /// Whether the state machine may move from `self` to `next`.
    ///
    /// Runs only move forward; `Aborted` is reachable from every non-terminal
    /// phase except `Configuring` and `Verifying`, which can no longer abort
    /// because both contracts already exist.
    pub fn can_advance_to(&self, next: DeploymentPhase) -> bool {
        use DeploymentPhase::*;
        match (self, next) {
            (Validating, PredictingAddresses)
            | (PredictingAddresses, DeployingA)
            | (DeployingA, DeployingB)
            | (DeployingB, Configuring)
            | (Configuring, Verifying)
            | (Verifying, Done) => true,
            (Validating | PredictingAddresses | DeployingA | DeployingB, Aborted) => true,
            _ => false,
        }
    }
}
