//! The single write path into the ledger and the candidate tally.
//!
//! Every mutation runs under one write lock, so the duplicate check, the append and the tally
//! increment are observed together or not at all. Reads take the read lock and hand back owned
//! copies.

use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::RwLock;

use crate::error::VoteError;
use crate::hasher::{BlockHasher, HashAlgorithm};
use crate::ledger::{now_millis, Ledger};
use crate::models::{Block, Candidate, CandidateMetadata, IntegrityReport, GENESIS_SENTINEL};
use crate::registry::CandidateRegistry;
use crate::store::ElectionSnapshot;

struct ElectionState {
    ledger: Ledger,
    registry: CandidateRegistry,
    /// Why writes stopped; set by the first fatal error, never cleared.
    halted: Option<String>,
}

impl ElectionState {
    fn ensure_writable(&self) -> Result<(), VoteError> {
        match &self.halted {
            Some(reason) => Err(VoteError::InvariantViolation(format!(
                "writes halted: {reason}"
            ))),
            None => Ok(()),
        }
    }

    /// Latches the halt on fatal errors before handing the error back.
    fn halt_on_fatal(&mut self, err: VoteError) -> VoteError {
        if err.is_fatal() && self.halted.is_none() {
            error!("AUDIT ALERT: {err}; writes halted");
            self.halted = Some(err.to_string());
        }
        err
    }
}

pub struct VoteService {
    state: RwLock<ElectionState>,
}

impl VoteService {
    /// A fresh election: initialized ledger, empty registry.
    pub fn new(hasher: Box<dyn BlockHasher>) -> Self {
        let mut ledger = Ledger::new(hasher);
        ledger.initialize();
        Self::from_parts(ledger, CandidateRegistry::new())
    }

    pub(crate) fn from_parts(ledger: Ledger, registry: CandidateRegistry) -> Self {
        VoteService {
            state: RwLock::new(ElectionState {
                ledger,
                registry,
                halted: None,
            }),
        }
    }

    pub fn cast_vote(&self, voter_id: &str, candidate_id: &str) -> Result<Block, VoteError> {
        let mut state = self.state.write();
        state.ensure_writable()?;

        if !state.registry.contains(candidate_id) {
            warn!("rejected vote from {voter_id}: unknown candidate {candidate_id}");
            return Err(VoteError::UnknownCandidate {
                candidate_id: candidate_id.to_string(),
            });
        }
        // The genesis block already holds the sentinel voter id.
        if voter_id == GENESIS_SENTINEL || state.ledger.has_voted(voter_id) {
            warn!("rejected vote from {voter_id}: already voted");
            return Err(VoteError::DuplicateVote {
                voter_id: voter_id.to_string(),
            });
        }

        let timestamp = match state.ledger.tail() {
            Some(tail) => now_millis().max(tail.timestamp),
            None => now_millis(),
        };
        let block = match state.ledger.append(candidate_id, voter_id, timestamp) {
            Ok(block) => block,
            Err(err) => return Err(state.halt_on_fatal(err.into())),
        };

        if let Err(err) = state.registry.increment_vote(candidate_id) {
            let err = match state.ledger.rollback(&block) {
                Ok(()) => VoteError::InvariantViolation(format!(
                    "tally update failed for block {}: {err}",
                    block.index
                )),
                Err(rollback) => rollback.into(),
            };
            return Err(state.halt_on_fatal(err));
        }

        info!(
            "vote recorded in block {} for candidate {candidate_id} (hash {})",
            block.index, block.hash
        );
        Ok(block)
    }

    /// Runs [`VoteService::cast_vote`] on the blocking pool and returns its handle as a future.
    pub async fn cast_vote_async(
        self: Arc<Self>,
        voter_id: String,
        candidate_id: String,
    ) -> Result<Block, VoteError> {
        tokio::task::spawn_blocking(move || self.cast_vote(&voter_id, &candidate_id))
            .await
            .map_err(|err| VoteError::InvariantViolation(format!("vote task failed: {err}")))?
    }

    pub fn add_candidate(&self, metadata: CandidateMetadata) -> Result<Candidate, VoteError> {
        let mut state = self.state.write();
        state.ensure_writable()?;
        let candidate = state.registry.add_candidate(metadata)?;
        info!("candidate {} registered as {}", candidate.name, candidate.id);
        Ok(candidate)
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.state.read().ledger.has_voted(voter_id)
    }

    pub fn candidate(&self, candidate_id: &str) -> Result<Candidate, VoteError> {
        Ok(self.state.read().registry.get(candidate_id)?.clone())
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.state.read().registry.candidates().to_vec()
    }

    pub fn ranked_results(&self) -> Vec<Candidate> {
        self.state.read().registry.ranked_results()
    }

    pub fn all_blocks(&self) -> Vec<Block> {
        self.state.read().ledger.all_blocks()
    }

    pub fn block(&self, index: u64) -> Option<Block> {
        self.state.read().ledger.block(index).cloned()
    }

    pub fn verify_integrity(&self) -> IntegrityReport {
        self.state.read().ledger.verify_integrity()
    }

    /// Verifies the chain and halts all further writes if it is broken.
    pub fn audit(&self) -> Result<IntegrityReport, VoteError> {
        let mut state = self.state.write();
        let report = state.ledger.verify_integrity();
        match report.first_broken_index {
            None => Ok(report),
            Some(index) => Err(state.halt_on_fatal(VoteError::IntegrityFailure { index })),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state.read().halted.is_some()
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.state.read().ledger.hasher().algorithm()
    }

    /// Consistent copy of the full state for persistence.
    pub fn snapshot(&self) -> ElectionSnapshot {
        let state = self.state.read();
        ElectionSnapshot {
            algorithm: state.ledger.hasher().algorithm(),
            blocks: state.ledger.all_blocks(),
            candidates: state.registry.candidates().to_vec(),
        }
    }

    #[cfg(test)]
    fn tamper<F: FnOnce(&mut Vec<Block>)>(&self, edit: F) {
        let mut state = self.state.write();
        let mut blocks = state.ledger.all_blocks();
        edit(&mut blocks);
        let hasher = state.ledger.hasher().algorithm().hasher();
        state.ledger = Ledger::unchecked(blocks, hasher);
    }
}
