use thiserror::Error;

use crate::hasher::HashAlgorithm;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("integrity failure at block {index}")]
    IntegrityFailure { index: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("candidate not found: {0}")]
    NotFound(String),

    #[error("candidate already registered: {0}")]
    DuplicateIdentity(String),

    #[error("invalid candidate metadata: {0}")]
    InvalidMetadata(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("voter {voter_id} has already voted")]
    DuplicateVote { voter_id: String },

    #[error("unknown candidate: {candidate_id}")]
    UnknownCandidate { candidate_id: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("integrity failure at block {index}")]
    IntegrityFailure { index: u64 },

    #[error(transparent)]
    Registry(RegistryError),
}

impl VoteError {
    /// Fatal errors halt further writes and are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VoteError::InvariantViolation(_) | VoteError::IntegrityFailure { .. }
        )
    }
}

impl From<LedgerError> for VoteError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvariantViolation(msg) => VoteError::InvariantViolation(msg),
            LedgerError::IntegrityFailure { index } => VoteError::IntegrityFailure { index },
        }
    }
}

impl From<RegistryError> for VoteError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(candidate_id) => VoteError::UnknownCandidate { candidate_id },
            other => VoteError::Registry(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed store document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored chain uses {stored}, configured hasher is {configured}")]
    AlgorithmMismatch {
        stored: HashAlgorithm,
        configured: HashAlgorithm,
    },

    #[error("stored chain failed verification: {0}")]
    Ledger(#[from] LedgerError),

    #[error("stored candidates are inconsistent: {0}")]
    Registry(#[from] RegistryError),

    #[error("stored state is inconsistent: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
