use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::kernel::constants;

/// Error raised while loading or validating configuration files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown or unsupported config format for path: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to deserialize from {format}: {message}")]
    Deserialize { format: String, message: String },

    #[error("Failed to serialize to {format}: {message}")]
    Serialize { format: String, message: String },

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Deserialize a value from a string in this format
    pub fn parse<T: DeserializeOwned>(&self, data: &str) -> Result<T, ConfigError> {
        let deserialize_error = |message: String| ConfigError::Deserialize {
            format: self.extension().to_uppercase(),
            message,
        };
        match self {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| deserialize_error(e.to_string())),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| deserialize_error(e.to_string())),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| deserialize_error(e.to_string())),
        }
    }

    /// Serialize a value to a string in this format
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, ConfigError> {
        let serialize_error = |message: String| ConfigError::Serialize {
            format: self.extension().to_uppercase(),
            message,
        };
        match self {
            ConfigFormat::Json => serde_json::to_string_pretty(value).map_err(|e| serialize_error(e.to_string())),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string())),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(value).map_err(|e| serialize_error(e.to_string())),
        }
    }
}

/// Load any deserializable document, picking the format from the extension
pub fn load_from_path<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(&content)
}

/// Configuration for dependency management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    /// Lifetime of a cached validation result, in seconds
    pub cache_ttl_secs: f64,

    /// Max depth for transitive dependency resolution. Reserved; the current
    /// resolver only looks at direct dependencies.
    pub max_depth: usize,

    /// Report optional dependency failures as warnings instead of errors
    pub ignore_optional: bool,

    /// Package index URLs
    pub package_index: String,
    pub extra_indexes: Vec<String>,

    /// Timeout for a single package version lookup, in seconds
    pub lookup_timeout_secs: f64,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: constants::DEFAULT_CACHE_TTL_SECS,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            ignore_optional: true,
            package_index: constants::DEFAULT_PACKAGE_INDEX.to_string(),
            extra_indexes: Vec::new(),
            lookup_timeout_secs: constants::DEFAULT_LOOKUP_TIMEOUT_SECS,
        }
    }
}

impl DependencyConfig {
    /// Load and validate a configuration file (JSON, YAML or TOML)
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cache_ttl_secs.is_finite() || self.cache_ttl_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl_secs".to_string(),
                message: format!("expected a non-negative number of seconds, got {}", self.cache_ttl_secs),
            });
        }
        if !self.lookup_timeout_secs.is_finite() || self.lookup_timeout_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "lookup_timeout_secs".to_string(),
                message: format!("expected a positive number of seconds, got {}", self.lookup_timeout_secs),
            });
        }
        if self.package_index.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "package_index".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Validation cache lifetime. Zero, or an unusable value, disables caching.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_from_secs_f64(self.cache_ttl_secs).unwrap_or(Duration::ZERO)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs_f64();
        self
    }

    pub fn with_ignore_optional(mut self, ignore_optional: bool) -> Self {
        self.ignore_optional = ignore_optional;
        self
    }

    /// Per-lookup timeout. Falls back to the default for unusable values.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.lookup_timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(constants::DEFAULT_LOOKUP_TIMEOUT_SECS))
    }

    /// Every configured index, primary first
    pub fn indexes(&self) -> Vec<&str> {
        std::iter::once(self.package_index.as_str())
            .chain(self.extra_indexes.iter().map(String::as_str))
            .collect()
    }
}
