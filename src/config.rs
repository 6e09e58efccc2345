//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (e.g. a `--config <path>` flag in the host service)
//! 2. `~/.muninn/config.toml` (user)
//! 3. `/etc/muninn/config.toml` (system)
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [retrieval]
//! top_k = 5
//! multi_hop = true
//! backend_timeout_ms = 10000
//!
//! [expansion]
//! max_hops = 2
//! known_terms = ["vector store", "ingest"]
//!
//! [cache]
//! max_entries = 1000
//! ttl_secs = 3600
//! collection = "handbook"
//! eviction = "least_recently_used"
//!
//! [retry]
//! max_attempts = 3
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::backends::{EmbeddingCacheSection, RetrySection};
use crate::cache::{CacheConfig, EvictionPolicy};
use crate::expand::ExpansionSection;
use crate::{MuninnError, Result};

/// Pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub expansion: ExpansionSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub embedding_cache: Option<EmbeddingCacheSection>,
    #[serde(default)]
    pub retry: Option<RetrySection>,
}

/// Stage selection and request sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSection {
    /// Default result count (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Enable reference expansion (default: false).
    #[serde(default)]
    pub multi_hop: bool,
    /// Deadline for each backend call in milliseconds (default: none).
    #[serde(default)]
    pub backend_timeout_ms: Option<u64>,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            multi_hop: false,
            backend_timeout_ms: None,
        }
    }
}

fn default_top_k() -> usize {
    crate::pipeline::DEFAULT_TOP_K
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Maximum entries (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Entry lifetime in seconds (default: 3600).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Collection identifier mixed into fingerprints (default: "documents").
    #[serde(default = "default_collection")]
    pub collection: String,
    /// "insertion_age" (default) or "least_recently_used".
    #[serde(default)]
    pub eviction: EvictionPolicy,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            collection: default_collection(),
            eviction: EvictionPolicy::default(),
        }
    }
}

fn default_max_entries() -> usize {
    1_000
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_collection() -> String {
    "documents".to_string()
}

impl From<CacheSection> for CacheConfig {
    fn from(section: CacheSection) -> Self {
        CacheConfig::new()
            .max_entries(section.max_entries)
            .ttl(Duration::from_secs(section.ttl_secs))
            .collection(section.collection)
            .eviction(section.eviction)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.muninn/config.toml`
    /// 3. `/etc/muninn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            MuninnError::Configuration(msg) => {
                MuninnError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MuninnError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".muninn").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/muninn/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(MuninnError::Configuration(
            "No config file found. Create ~/.muninn/config.toml or /etc/muninn/config.toml"
                .to_string(),
        ))
    }

    /// Reject values that would make the pipeline degenerate.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(MuninnError::Configuration(msg.to_string()));
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be at least 1");
        }
        if self.expansion.max_hops == 0 {
            return invalid("expansion.max_hops must be at least 1");
        }
        if self.expansion.max_terms_per_hop == 0 {
            return invalid("expansion.max_terms_per_hop must be at least 1");
        }
        if self.expansion.follow_up_top_k == 0 {
            return invalid("expansion.follow_up_top_k must be at least 1");
        }
        if self.cache.max_entries == 0 {
            return invalid("cache.max_entries must be at least 1");
        }
        if self.cache.ttl_secs == 0 {
            return invalid("cache.ttl_secs must be at least 1");
        }
        if let Some(retry) = &self.retry
            && retry.max_attempts == 0
        {
            return invalid("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Result cache configuration from the `[cache]` section.
    pub fn cache_config(&self) -> CacheConfig {
        self.cache.clone().into()
    }
}
