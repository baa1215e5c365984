use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store's aggregates disagree with the records it returned.
    #[error("inconsistent store state: {0}")]
    Inconsistent(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}
