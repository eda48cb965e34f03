use serde::{Deserialize, Serialize};
use strum::Display;

/// Whether creation transactions carry an explicit nonce.
///
/// `Pinned` sets the predicted nonce on both creation transactions so that an
/// interleaved transaction from the same account makes the node reject the
/// creation instead of silently shifting the predicted addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoncePinning {
    #[default]
    Pinned,
    Unpinned,
}

impl NoncePinning {
    pub fn is_pinned(&self) -> bool {
        matches!(self, NoncePinning::Pinned)
    }
}
