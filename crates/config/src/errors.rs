/// A deployment record with one or more required fields left unset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("incomplete configuration, missing: {}", .missing.join(", "))]
pub struct IncompleteConfiguration {
    pub missing: Vec<String>,
}
