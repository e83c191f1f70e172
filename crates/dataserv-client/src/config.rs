//! Client configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use dataserv_core::{HashScope, SHARD_SIZE};
use serde::{Deserialize, Serialize};

use crate::api::RetryPolicy;
use crate::error::{ClientError, Result};

/// Coordinator used when none is configured
pub const DEFAULT_URL: &str = "http://127.0.0.1:5000";

/// Storage committed when none is configured (1 GiB)
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024 * 1024;

/// Retries after a failed connection
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Seconds between connection retries
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Seconds between heartbeats while polling
pub const DEFAULT_POLL_DELAY_SECS: u64 = 15;

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "DATASERV_CONFIG";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Coordinator base URL
    pub url: String,

    /// Client address (the identity shards derive from)
    pub address: Option<String>,

    /// Total storage committed, in bytes. Accepts `"1G"` style strings.
    #[serde(deserialize_with = "byte_count::deserialize")]
    pub max_size: u64,

    /// Size of each shard in bytes
    #[serde(deserialize_with = "byte_count::deserialize")]
    pub shard_size: u64,

    /// Directory holding the shard files
    pub store_path: PathBuf,

    /// Retries after a failed connection
    pub retry_limit: u32,

    /// Seconds between connection retries
    pub retry_delay_secs: u64,

    /// Seconds between heartbeats while polling
    pub poll_delay_secs: u64,

    /// Portion of each shard covered by content hashes and audit tokens
    pub hash_scope: HashScope,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            address: None,
            max_size: DEFAULT_MAX_SIZE,
            shard_size: SHARD_SIZE,
            store_path: Self::default_store_path(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            poll_delay_secs: DEFAULT_POLL_DELAY_SECS,
            hash_scope: HashScope::default(),
        }
    }
}

impl ClientConfig {
    fn default_store_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dataserv-client")
            .join("shards")
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from `explicit` if given, else from `$DATASERV_CONFIG` if it
    /// points at an existing file, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create the store directory if it doesn't exist
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.store_path)?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_limit, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_secs)
    }
}

/// Byte counts given either as integers or as `"128M"` style strings
mod byte_count {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bytes(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(n),
            Raw::Text(s) => {
                dataserv_core::parse_byte_count(&s).map_err(serde::de::Error::custom)
            }
        }
    }
}
