//! Flat-file persistence: `blocks.json` and `candidates.json` in one data directory.
//!
//! Nothing loaded from disk is trusted until the chain verifies and the stored tallies agree
//! with the ones derived from the chain.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::hasher::{BlockHasher, HashAlgorithm};
use crate::ledger::Ledger;
use crate::models::{Block, Candidate};
use crate::registry::CandidateRegistry;
use crate::service::VoteService;

const BLOCKS_FILE: &str = "blocks.json";
const CANDIDATES_FILE: &str = "candidates.json";

/// Full core state as written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionSnapshot {
    pub algorithm: HashAlgorithm,
    pub blocks: Vec<Block>,
    pub candidates: Vec<Candidate>,
}

impl ElectionSnapshot {
    /// Rebuilds a running service, rejecting state that fails verification.
    pub fn restore(self, hasher: Box<dyn BlockHasher>) -> Result<VoteService, StoreError> {
        if self.algorithm != hasher.algorithm() {
            return Err(StoreError::AlgorithmMismatch {
                stored: self.algorithm,
                configured: hasher.algorithm(),
            });
        }

        let ledger = Ledger::from_blocks(self.blocks, hasher).map_err(|err| {
            error!("AUDIT ALERT: refusing stored ledger: {err}");
            err
        })?;
        let registry = CandidateRegistry::from_candidates(self.candidates)?;

        for block in ledger.blocks().iter().skip(1) {
            if !registry.contains(&block.candidate) {
                return Err(StoreError::Inconsistent(format!(
                    "block {} references unknown candidate {}",
                    block.index, block.candidate
                )));
            }
        }
        for candidate in registry.candidates() {
            let derived = ledger.votes_for(&candidate.id);
            if candidate.votes != derived {
                return Err(StoreError::Inconsistent(format!(
                    "candidate {} stores {} votes, chain records {}",
                    candidate.id, candidate.votes, derived
                )));
            }
        }

        Ok(VoteService::from_parts(ledger, registry))
    }
}

#[derive(Serialize, Deserialize)]
struct BlocksDocument {
    algorithm: HashAlgorithm,
    blocks: Vec<Block>,
}

pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir)?;
        Ok(JsonStore {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `None` when the store has never been written.
    pub fn load(&self) -> Result<Option<ElectionSnapshot>, StoreError> {
        let blocks_path = self.dir.join(BLOCKS_FILE);
        let candidates_path = self.dir.join(CANDIDATES_FILE);

        match (blocks_path.exists(), candidates_path.exists()) {
            (false, false) => return Ok(None),
            (true, true) => {}
            _ => {
                return Err(StoreError::Inconsistent(format!(
                    "{} must contain both {BLOCKS_FILE} and {CANDIDATES_FILE}",
                    self.dir.display()
                )))
            }
        }

        let blocks: BlocksDocument = serde_json::from_slice(&fs::read(&blocks_path)?)?;
        let candidates: Vec<Candidate> = serde_json::from_slice(&fs::read(&candidates_path)?)?;
        debug!(
            "loaded {} blocks and {} candidates from {}",
            blocks.blocks.len(),
            candidates.len(),
            self.dir.display()
        );

        Ok(Some(ElectionSnapshot {
            algorithm: blocks.algorithm,
            blocks: blocks.blocks,
            candidates,
        }))
    }

    /// Loads and restores the stored election, or `None` if nothing is stored.
    pub fn restore(&self, hasher: Box<dyn BlockHasher>) -> Result<Option<VoteService>, StoreError> {
        match self.load()? {
            Some(snapshot) => {
                let service = snapshot.restore(hasher)?;
                info!(
                    "restored election with {} blocks from {}",
                    service.all_blocks().len(),
                    self.dir.display()
                );
                Ok(Some(service))
            }
            None => Ok(None),
        }
    }

    pub fn save(&self, snapshot: &ElectionSnapshot) -> Result<(), StoreError> {
        let blocks = BlocksDocument {
            algorithm: snapshot.algorithm,
            blocks: snapshot.blocks.clone(),
        };
        self.write_atomic(BLOCKS_FILE, &serde_json::to_vec_pretty(&blocks)?)?;
        self.write_atomic(CANDIDATES_FILE, &serde_json::to_vec_pretty(&snapshot.candidates)?)?;
        debug!("saved {} blocks to {}", snapshot.blocks.len(), self.dir.display());
        Ok(())
    }

    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
