use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::hasher::HashAlgorithm;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub hash: HashAlgorithm,
    /// Register the default roster when the store is empty.
    pub seed_candidates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 10040,
            data_dir: PathBuf::from("data"),
            hash: HashAlgorithm::Sha256,
            seed_candidates: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(host) = vars.get("SERVER_HOST") {
            config.host = host.clone();
        }
        if let Some(port) = vars.get("SERVER_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "SERVER_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = vars.get("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(hash) = vars.get("LEDGER_HASH") {
            config.hash = hash.parse()?;
        }
        if let Some(seed) = vars.get("LEDGER_SEED_CANDIDATES") {
            config.seed_candidates = parse_bool(seed).ok_or_else(|| ConfigError::Invalid {
                key: "LEDGER_SEED_CANDIDATES",
                value: seed.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
