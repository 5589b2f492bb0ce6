use serde::{Deserialize, Serialize};

/// Reserved voter/candidate id carried by the genesis block.
pub const GENESIS_SENTINEL: &str = "GENESIS";

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// The hashed part of a block. Field order is part of the digest.
#[derive(Serialize)]
pub struct BlockContent<'a> {
    pub index: u64,
    pub timestamp: u64,
    pub voter: &'a str,
    pub candidate: &'a str,
    pub previous_hash: &'a str,
}

/// One hash-linked record of a single cast vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub voter: String,
    pub candidate: String,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    pub fn content(&self) -> BlockContent<'_> {
        BlockContent {
            index: self.index,
            timestamp: self.timestamp,
            voter: &self.voter,
            candidate: &self.candidate,
            previous_hash: &self.previous_hash,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
            && self.voter == GENESIS_SENTINEL
            && self.candidate == GENESIS_SENTINEL
            && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub party: String,
    pub position: String,
    pub image: String,
    /// Derived from the ledger; never edited directly.
    pub votes: u64,
}

/// Descriptive fields supplied when registering a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    /// Explicit identifier. The registry assigns the next free one when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub party: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub image: String,
}

/// Outcome of walking the chain from genesis forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub first_broken_index: Option<u64>,
}

impl IntegrityReport {
    pub fn intact() -> Self {
        IntegrityReport {
            valid: true,
            first_broken_index: None,
        }
    }

    pub fn broken_at(index: u64) -> Self {
        IntegrityReport {
            valid: false,
            first_broken_index: Some(index),
        }
    }
}
