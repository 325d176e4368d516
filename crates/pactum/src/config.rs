//! Engine configuration.

use std::time::Duration;

use pactum_perms::MasterSecret;
use thiserror::Error;

/// Environment variable holding the master encryption secret.
pub const ENV_MASTER_KEY: &str = "PACTUM_MASTER_KEY";
/// Environment variable overriding the role cache TTL, in seconds.
pub const ENV_ROLE_CACHE_TTL_SECS: &str = "PACTUM_ROLE_CACHE_TTL_SECS";
/// Environment variable overriding the maximum upload size, in bytes.
pub const ENV_MAX_FILE_SIZE: &str = "PACTUM_MAX_FILE_SIZE";

const DEFAULT_ROLE_CACHE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_FILE_URL_PREFIX: &str = "/api/contracts";
const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Configuration for the lifecycle engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Secret every per-contract key is derived from.
    pub master_secret: MasterSecret,
    /// How long resolved roles stay cached.
    pub role_cache_ttl: Duration,
    /// Prefix of the download URL recorded on uploaded files.
    pub file_url_prefix: String,
    /// Largest accepted upload, in bytes.
    pub max_file_size: usize,
}

impl EngineConfig {
    /// Configuration with defaults for everything but the secret.
    pub fn new(master_secret: MasterSecret) -> Self {
        Self {
            master_secret,
            role_cache_ttl: DEFAULT_ROLE_CACHE_TTL,
            file_url_prefix: DEFAULT_FILE_URL_PREFIX.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_role_cache_ttl(mut self, ttl: Duration) -> Self {
        self.role_cache_ttl = ttl;
        self
    }

    pub fn with_file_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_url_prefix = prefix.into();
        self
    }

    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENV_MASTER_KEY).ok_or(ConfigError::Missing(ENV_MASTER_KEY))?;
        let master_secret =
            MasterSecret::new(secret.into_bytes()).map_err(|_| ConfigError::Empty(ENV_MASTER_KEY))?;

        let mut config = Self::new(master_secret);

        if let Some(raw) = lookup(ENV_ROLE_CACHE_TTL_SECS) {
            let secs: u64 = parse(ENV_ROLE_CACHE_TTL_SECS, &raw)?;
            config.role_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_MAX_FILE_SIZE) {
            config.max_file_size = parse(ENV_MAX_FILE_SIZE, &raw)?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
