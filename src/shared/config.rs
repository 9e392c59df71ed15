use std::time::Duration;

/// Environment variable overriding [`StoreConfig::max_retries`]
pub const MAX_RETRIES_ENV: &str = "READING_SYNC_MAX_RETRIES";
/// Environment variable overriding [`StoreConfig::retry_backoff`], in milliseconds
pub const RETRY_BACKOFF_MS_ENV: &str = "READING_SYNC_RETRY_BACKOFF_MS";

pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for the reading store's sync behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Additional attempts after the first failed one (2 means 3 attempts total)
    pub max_retries: u32,
    /// Pause between attempts; zero retries immediately
    pub retry_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::ZERO,
        }
    }
}

impl StoreConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Total attempts an operation gets before failing
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Load configuration from environment variables
    /// Unset variables fall back to the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_RETRIES_ENV) {
            config.max_retries = parse_var(MAX_RETRIES_ENV, &raw)?;
        }

        if let Some(raw) = lookup(RETRY_BACKOFF_MS_ENV) {
            let millis: u64 = parse_var(RETRY_BACKOFF_MS_ENV, &raw)?;
            config.retry_backoff = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
        name: name.to_string(),
        value: raw.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for environment variable {name}")]
    InvalidEnvVar { name: String, value: String },
}
