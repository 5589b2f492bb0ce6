//! Campus election ledger: a single-writer, hash-chained record of one vote per voter,
//! with a candidate tally derived from it.

pub mod api;
pub mod config;
pub mod error;
pub mod hasher;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, LedgerError, RegistryError, StoreError, VoteError};
pub use hasher::{BlockHasher, HashAlgorithm, Md5Hasher, Sha256Hasher};
pub use ledger::Ledger;
pub use models::{Block, Candidate, CandidateMetadata, IntegrityReport};
pub use registry::CandidateRegistry;
pub use service::VoteService;
pub use store::{ElectionSnapshot, JsonStore};
