//! Configuration for index building and querying.
//!
//! Sources are layered with `figment`, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`kdindex.toml` unless another path is given)
//! 3. environment variables prefixed `KDINDEX_`, with `__` separating
//!    sections, e.g. `KDINDEX_BUILD__PARTITION=sort`
//!
//! ```toml
//! [build]
//! partition = "select"
//!
//! [search]
//! default_k = 10
//! max_k = 10000
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "kdindex.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "KDINDEX_";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A source could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// A value is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending key.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<ConfigError> for crate::error::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// How each implicit node is partitioned around its median during build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStrategy {
    /// Linear-time selection of the median per node, O(N log N) overall.
    #[default]
    Select,
    /// Full sort of each node range on its axis, O(N log² N) overall.
    Sort,
}

impl PartitionStrategy {
    /// Name used in log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Sort => "sort",
        }
    }
}

/// Build-time settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Median partitioning method.
    pub partition: PartitionStrategy,
}

/// Query-time settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// k used when the caller does not specify one.
    pub default_k: usize,
    /// Largest k a caller may request through [`SearchConfig::clamp_k`].
    pub max_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: 10,
            max_k: 10_000,
        }
    }
}

impl SearchConfig {
    /// Resolves a requested k against the configured default and ceiling.
    #[must_use]
    pub fn clamp_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_k).min(self.max_k)
    }
}

/// Logging settings, consumed by binaries that install a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `kdindex_core=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KdIndexConfig {
    /// Build-time settings.
    pub build: BuildConfig,
    /// Query-time settings.
    pub search: SearchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl KdIndexConfig {
    /// Loads configuration from `kdindex.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Loads configuration from the given TOML file (if present) and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path.as_ref())
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string layered over the defaults.
    ///
    /// Environment variables are not consulted.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The layered provider stack used by [`KdIndexConfig::load_from`].
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.max_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.max_k",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.search.default_k == 0 || self.search.default_k > self.search.max_k {
            return Err(ConfigError::InvalidValue {
                field: "search.default_k",
                reason: format!("must be in 1..={}", self.search.max_k),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Load(e.to_string()))
    }
}
