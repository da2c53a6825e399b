//! Configuration loading.
//!
//! Configuration is loaded from a TOML file with the following resolution order:
//! 1. an explicit path (e.g. `--config <path>`)
//! 2. `~/.paddock/config.toml` (user)
//! 3. `/etc/paddock/config.toml` (system)
//! 4. built-in defaults
//!
//! ```toml
//! [api]
//! base_url = "https://api.openf1.org/v1"
//! timeout_secs = 30
//!
//! [cache]
//! max_entries = 1000
//! static_ttl_secs = 1800
//! dynamic_ttl_secs = 1800
//! durable = "file"            # or "memory"
//! durable_path = "/var/cache/paddock"
//! durable_quota_bytes = 5242880
//!
//! [fetch]
//! batch_size = 3
//! cooldown_ms = 350
//! retry_attempts = 3
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_TTL, DurableStore, FileDurableStore, MemoryDurableStore};
use crate::gateway::{Paddock, PaddockBuilder};
use crate::providers::openf1::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::providers::{BatchConfig, DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN, RetryConfig};
use crate::{PaddockError, Result};

/// File configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub fetch: FetchSection,
}

/// Remote API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Where durable cache entries live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    /// Process lifetime only.
    #[default]
    Memory,
    /// One JSON file per entry.
    File,
}

/// Cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_ttl_secs")]
    pub static_ttl_secs: u64,
    #[serde(default = "default_ttl_secs")]
    pub dynamic_ttl_secs: u64,
    #[serde(default)]
    pub durable: DurableBackend,
    /// Directory for the file backend (default: `~/.cache/paddock/session`).
    #[serde(default)]
    pub durable_path: Option<PathBuf>,
    #[serde(default)]
    pub durable_quota_bytes: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            static_ttl_secs: default_ttl_secs(),
            dynamic_ttl_secs: default_ttl_secs(),
            durable: DurableBackend::default(),
            durable_path: None,
            durable_quota_bytes: None,
        }
    }
}

fn default_max_entries() -> u64 {
    CacheConfig::default().max_entries
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

/// Fetch scheduling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSection {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Attempts per fetch including the first; 1 disables retry (default: 3).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            cooldown_ms: default_cooldown_ms(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN.as_millis() as u64
}

fn default_retry_attempts() -> u32 {
    3
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path that does not exist is an error. With no explicit
    /// path and no file in the standard locations, defaults are used.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PaddockError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            PaddockError::Configuration(msg) => {
                PaddockError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PaddockError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(PaddockError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".paddock").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/paddock/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache.max_entries)
            .static_ttl(Duration::from_secs(self.cache.static_ttl_secs))
            .dynamic_ttl(Duration::from_secs(self.cache.dynamic_ttl_secs))
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new()
            .batch_size(self.fetch.batch_size)
            .cooldown(Duration::from_millis(self.fetch.cooldown_ms))
    }

    /// Open the configured durable layer.
    pub fn durable_store(&self) -> Result<Arc<dyn DurableStore>> {
        let quota = self.cache.durable_quota_bytes;
        Ok(match self.cache.durable {
            DurableBackend::Memory => match quota {
                Some(bytes) => Arc::new(MemoryDurableStore::with_quota(
                    usize::try_from(bytes).unwrap_or(usize::MAX),
                )),
                None => Arc::new(MemoryDurableStore::new()),
            },
            DurableBackend::File => {
                let dir = self
                    .cache
                    .durable_path
                    .clone()
                    .unwrap_or_else(FileDurableStore::default_dir);
                let store = FileDurableStore::open(dir)?;
                match quota {
                    Some(bytes) => Arc::new(store.quota(bytes)),
                    None => Arc::new(store),
                }
            }
        })
    }

    /// A gateway builder with every setting of this config applied.
    pub fn builder(&self) -> Result<PaddockBuilder> {
        let mut builder = Paddock::builder()
            .base_url(self.api.base_url.clone())
            .timeout(Duration::from_secs(self.api.timeout_secs))
            .cache_config(self.cache_config())
            .durable(self.durable_store()?)
            .batch(self.batch_config());
        if self.fetch.retry_attempts > 1 {
            builder = builder.retry(RetryConfig::new().max_attempts(self.fetch.retry_attempts));
        }
        Ok(builder)
    }
}
