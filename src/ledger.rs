//! Append-only, hash-chained vote ledger.
//!
//! Block 0 is the genesis sentinel. Every later block records exactly one vote and links to
//! its predecessor through `previous_hash`, so an edit to block `i` breaks the stored hash of
//! `i` and the link check of `i + 1`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LedgerError;
use crate::hasher::BlockHasher;
use crate::models::{Block, BlockContent, IntegrityReport, GENESIS_PREVIOUS_HASH, GENESIS_SENTINEL};

/// Milliseconds since the Unix epoch, saturating to 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct Ledger {
    blocks: Vec<Block>,
    /// voter id -> block index, genesis excluded.
    voters: HashMap<String, u64>,
    hasher: Box<dyn BlockHasher>,
}

impl Ledger {
    /// An uninitialized ledger. Call [`Ledger::initialize`] before appending.
    pub fn new(hasher: Box<dyn BlockHasher>) -> Self {
        Ledger {
            blocks: Vec::new(),
            voters: HashMap::new(),
            hasher,
        }
    }

    /// Rebuilds a ledger from persisted blocks, refusing anything that does not verify.
    pub fn from_blocks(blocks: Vec<Block>, hasher: Box<dyn BlockHasher>) -> Result<Self, LedgerError> {
        if blocks.is_empty() {
            return Err(LedgerError::InvariantViolation(
                "stored chain has no genesis block".to_string(),
            ));
        }

        let mut ledger = Ledger {
            blocks,
            voters: HashMap::new(),
            hasher,
        };

        let report = ledger.verify_integrity();
        if let Some(index) = report.first_broken_index {
            return Err(LedgerError::IntegrityFailure { index });
        }

        for block in ledger.blocks.iter().skip(1) {
            if block.voter == GENESIS_SENTINEL || block.candidate == GENESIS_SENTINEL {
                return Err(LedgerError::InvariantViolation(format!(
                    "block {} uses the reserved {GENESIS_SENTINEL} id",
                    block.index
                )));
            }
            if ledger.voters.insert(block.voter.clone(), block.index).is_some() {
                return Err(LedgerError::InvariantViolation(format!(
                    "voter {} appears more than once",
                    block.voter
                )));
            }
        }

        Ok(ledger)
    }

    /// Replaces the chain wholesale, skipping verification. Tests use it to simulate
    /// corruption of an already-running ledger.
    #[cfg(test)]
    pub(crate) fn unchecked(blocks: Vec<Block>, hasher: Box<dyn BlockHasher>) -> Self {
        let voters = blocks
            .iter()
            .skip(1)
            .map(|b| (b.voter.clone(), b.index))
            .collect();
        Ledger {
            blocks,
            voters,
            hasher,
        }
    }

    /// Creates the genesis block once. Later calls return the existing genesis unchanged.
    pub fn initialize(&mut self) -> &Block {
        if self.blocks.is_empty() {
            let timestamp = now_millis();
            let hash = self.hasher.hash_block(&BlockContent {
                index: 0,
                timestamp,
                voter: GENESIS_SENTINEL,
                candidate: GENESIS_SENTINEL,
                previous_hash: GENESIS_PREVIOUS_HASH,
            });
            self.blocks.push(Block {
                index: 0,
                timestamp,
                voter: GENESIS_SENTINEL.to_string(),
                candidate: GENESIS_SENTINEL.to_string(),
                previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
                hash,
            });
        }
        &self.blocks[0]
    }

    pub fn is_initialized(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voters.contains_key(voter_id)
    }

    pub fn append(
        &mut self,
        candidate_id: &str,
        voter_id: &str,
        timestamp: u64,
    ) -> Result<Block, LedgerError> {
        let tail = self.blocks.last().ok_or_else(|| {
            LedgerError::InvariantViolation("ledger has not been initialized".to_string())
        })?;

        if voter_id == GENESIS_SENTINEL || candidate_id == GENESIS_SENTINEL {
            return Err(LedgerError::InvariantViolation(format!(
                "{GENESIS_SENTINEL} is reserved for the genesis block"
            )));
        }
        if self.voters.contains_key(voter_id) {
            return Err(LedgerError::InvariantViolation(format!(
                "voter {voter_id} already has a block"
            )));
        }

        let index = tail.index + 1;
        let hash = self.hasher.hash_block(&BlockContent {
            index,
            timestamp,
            voter: voter_id,
            candidate: candidate_id,
            previous_hash: &tail.hash,
        });
        let block = Block {
            index,
            timestamp,
            voter: voter_id.to_string(),
            candidate: candidate_id.to_string(),
            previous_hash: tail.hash.clone(),
            hash,
        };

        self.voters.insert(block.voter.clone(), index);
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Undoes the append that produced `block`, used when the paired tally update fails
    /// before any reader could observe the new tail.
    pub(crate) fn rollback(&mut self, block: &Block) -> Result<(), LedgerError> {
        match self.blocks.last() {
            Some(tail) if tail.index > 0 && tail == block => {
                self.voters.remove(&block.voter);
                self.blocks.pop();
                Ok(())
            }
            _ => Err(LedgerError::InvariantViolation(format!(
                "block {} is not the tail and cannot be rolled back",
                block.index
            ))),
        }
    }

    /// Walks the chain from genesis forward. Never mutates the ledger.
    pub fn verify_integrity(&self) -> IntegrityReport {
        for (position, block) in self.blocks.iter().enumerate() {
            let position = position as u64;

            if block.index != position {
                return IntegrityReport::broken_at(position);
            }
            if position == 0 && !block.is_genesis() {
                return IntegrityReport::broken_at(0);
            }
            if self.hasher.hash_block(&block.content()) != block.hash {
                return IntegrityReport::broken_at(position);
            }
            if position > 0 && block.previous_hash != self.blocks[position as usize - 1].hash {
                return IntegrityReport::broken_at(position);
            }
        }
        IntegrityReport::intact()
    }

    pub fn all_blocks(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(index).ok()?)
    }

    pub fn block_of_voter(&self, voter_id: &str) -> Option<&Block> {
        self.voters.get(voter_id).and_then(|index| self.block(*index))
    }

    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of recorded votes, genesis excluded.
    pub fn vote_count(&self) -> usize {
        self.blocks.len().saturating_sub(1)
    }

    pub fn votes_for(&self, candidate_id: &str) -> u64 {
        self.blocks
            .iter()
            .skip(1)
            .filter(|b| b.candidate == candidate_id)
            .count() as u64
    }

    pub fn hasher(&self) -> &dyn BlockHasher {
        self.hasher.as_ref()
    }
}
