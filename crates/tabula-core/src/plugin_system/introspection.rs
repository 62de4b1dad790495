//! Installed-package introspection.
//!
//! The resolver never inspects the environment itself; it asks a
//! [`VersionSource`] for the installed version of each dependency. Timeouts
//! are the source's responsibility, see [`TimeoutVersionSource`].
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::plugin_system::config::{ConfigError, load_from_path};
use crate::plugin_system::version::parse_version;

/// Error returned by a failed installed-version lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionLookupError {
    #[error("Version lookup for '{package}' timed out after {timeout:?}")]
    Timeout { package: String, timeout: Duration },

    #[error("Installed version '{version}' of '{package}' is not a valid version: {message}")]
    InvalidVersion {
        package: String,
        version: String,
        message: String,
    },

    #[error("Version lookup for '{package}' failed: {message}")]
    Unavailable { package: String, message: String },
}

/// Answers "which version of this package is installed?"
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// `Ok(None)` when the package is not installed
    async fn installed_version(&self, package: &str) -> Result<Option<Version>, VersionLookupError>;
}

/// Package names compare case-insensitively, with `_` and `.` equivalent to `-`
pub fn normalize_package_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '.'], "-")
}

/// On-disk form of an installed-package table: `{"packages": {"numpy": "1.24.0"}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackages {
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
}

/// A fixed table of installed packages.
///
/// Versions are stored as reported and parsed on lookup, so a malformed
/// entry surfaces as [`VersionLookupError::InvalidVersion`] for that package
/// only.
#[derive(Debug, Clone, Default)]
pub struct StaticVersionSource {
    packages: HashMap<String, String>,
}

impl StaticVersionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a package table from a JSON, YAML or TOML file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let installed: InstalledPackages = load_from_path(path)?;
        let mut source = Self::new();
        for (name, version) in &installed.packages {
            source.insert(name, version);
        }
        debug!("Loaded {} installed packages from {}", source.len(), path.display());
        Ok(source)
    }

    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.insert(name, version);
        self
    }

    pub fn insert(&mut self, name: &str, version: &str) {
        self.packages
            .insert(normalize_package_name(name), version.trim().to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.packages.remove(&normalize_package_name(name))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[async_trait]
impl VersionSource for StaticVersionSource {
    async fn installed_version(&self, package: &str) -> Result<Option<Version>, VersionLookupError> {
        let Some(raw) = self.packages.get(&normalize_package_name(package)) else {
            debug!("Package '{}' is not installed", package);
            return Ok(None);
        };
        parse_version(raw)
            .map(Some)
            .map_err(|e| VersionLookupError::InvalidVersion {
                package: package.to_string(),
                version: raw.clone(),
                message: e.to_string(),
            })
    }
}

/// Wraps another source and bounds every lookup by a timeout
#[derive(Debug, Clone)]
pub struct TimeoutVersionSource<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutVersionSource<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: VersionSource> VersionSource for TimeoutVersionSource<S> {
    async fn installed_version(&self, package: &str) -> Result<Option<Version>, VersionLookupError> {
        match tokio::time::timeout(self.timeout, self.inner.installed_version(package)).await {
            Ok(result) => result,
            Err(_) => Err(VersionLookupError::Timeout {
                package: package.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}
