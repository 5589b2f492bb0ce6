//! Block digests.
//!
//! The ledger only depends on [`BlockHasher`]; which algorithm backs it is a
//! configuration choice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::models::BlockContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Md5,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
        }
    }

    pub fn hasher(&self) -> Box<dyn BlockHasher> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
            HashAlgorithm::Md5 => Box::new(Md5Hasher),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "md5" => Ok(HashAlgorithm::Md5),
            other => Err(ConfigError::Invalid {
                key: "LEDGER_HASH",
                value: other.to_string(),
            }),
        }
    }
}

/// Deterministic, fixed-length digest over raw bytes, rendered as lower-case hex.
pub trait BlockHasher: Send + Sync {
    fn digest(&self, content: &[u8]) -> String;

    fn algorithm(&self) -> HashAlgorithm;

    fn hash_block(&self, content: &BlockContent<'_>) -> String {
        // Serializing a struct of plain strings and integers cannot fail.
        let bytes = serde_json::to_vec(content).unwrap_or_default();
        self.digest(&bytes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl BlockHasher for Sha256Hasher {
    fn digest(&self, content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{:x}", hasher.finalize())
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// Fast digest, adequate for display-level tamper detection only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl BlockHasher for Md5Hasher {
    fn digest(&self, content: &[u8]) -> String {
        format!("{:x}", md5::compute(content))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Md5
    }
}
