//! Declarative format descriptions.
//!
//! A [`FormatManifest`] describes a table-format plugin in data: identity,
//! capabilities and package dependencies. [`ManifestPlugin`] turns one into a
//! working [`TableFormatPlugin`] whose dependency validation goes through a
//! shared [`DependencyResolver`].
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::kernel::constants::TABLE_FORMAT_INTERFACE;
use crate::plugin_system::config::{ConfigError, load_from_path};
use crate::plugin_system::conflict::is_valid_requirement;
use crate::plugin_system::dependency::DependencySpec;
use crate::plugin_system::lifecycle::PluginStatus;
use crate::plugin_system::metadata::{PluginIdentity, PluginMetadata};
use crate::plugin_system::resolver::DependencyResolver;
use crate::plugin_system::traits::{PluginError, TableFormatPlugin};
use crate::plugin_system::validation::ValidationResult;
use crate::plugin_system::version::parse_version;

fn default_interfaces() -> Vec<String> {
    vec![TABLE_FORMAT_INTERFACE.to_string()]
}

/// Describes a table-format plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatManifest {
    /// Unique identifier for the plugin
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Capability names
    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

impl FormatManifest {
    pub fn new(id: &str, name: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            interfaces: default_interfaces(),
            dependencies: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Add a capability name
    pub fn interface(mut self, interface: &str) -> Self {
        if !self.interfaces.iter().any(|i| i == interface) {
            self.interfaces.push(interface.to_string());
        }
        self
    }

    pub fn dependency(mut self, dependency: DependencySpec) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(&self.id, &self.name, &self.version)
    }

    /// Metadata as the registry would record it
    pub fn to_metadata(&self) -> PluginMetadata {
        PluginMetadata::new(self.identity())
            .with_interfaces(self.interfaces.clone())
            .with_dependencies(self.dependencies.iter().cloned())
    }

    /// Structural problems with the manifest, empty when it is well formed
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.id.trim().is_empty() {
            problems.push("Manifest id must not be empty".to_string());
        }
        if let Err(e) = parse_version(&self.version) {
            problems.push(format!("Manifest {} has an invalid version: {}", self.id, e));
        }
        for dep in &self.dependencies {
            if !is_valid_requirement(&dep.version) {
                problems.push(format!(
                    "Manifest {} declares an invalid requirement '{}' for {}",
                    self.id, dep.version, dep.name
                ));
            }
        }
        problems
    }
}

/// A list of manifests, as stored in a catalog file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCatalog {
    #[serde(default)]
    pub formats: Vec<FormatManifest>,
}

impl FormatCatalog {
    /// Load a catalog from a JSON, YAML or TOML file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let catalog: Self = load_from_path(path)?;
        debug!("Loaded {} formats from {}", catalog.formats.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn metadata(&self) -> Vec<PluginMetadata> {
        self.formats.iter().map(FormatManifest::to_metadata).collect()
    }
}

/// A plugin defined entirely by its manifest
pub struct ManifestPlugin {
    manifest: FormatManifest,
    resolver: Arc<DependencyResolver>,
    status: RwLock<PluginStatus>,
}

impl ManifestPlugin {
    pub fn new(manifest: FormatManifest, resolver: Arc<DependencyResolver>) -> Self {
        Self {
            manifest,
            resolver,
            status: RwLock::new(PluginStatus::Registered),
        }
    }

    pub fn manifest(&self) -> &FormatManifest {
        &self.manifest
    }

    fn set_status(&self, status: PluginStatus) {
        let mut guard = self.status.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = status;
    }
}

#[async_trait]
impl TableFormatPlugin for ManifestPlugin {
    fn id(&self) -> &str {
        &self.manifest.id
    }

    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn interfaces(&self) -> Vec<String> {
        self.manifest.interfaces.clone()
    }

    async fn initialize(&self) -> Result<(), PluginError> {
        self.set_status(PluginStatus::Initializing);
        let problems = self.manifest.problems();
        if !problems.is_empty() {
            self.set_status(PluginStatus::Error);
            return Err(PluginError::InitError(problems.join("; ")));
        }
        self.set_status(PluginStatus::Active);
        info!("Format {} v{} initialized", self.manifest.id, self.manifest.version);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        self.set_status(PluginStatus::Registered);
        info!("Format {} shut down", self.manifest.id);
        Ok(())
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        self.manifest.dependencies.clone()
    }

    async fn validate_dependencies(&self) -> ValidationResult {
        self.resolver.validate_dependencies(&self.manifest.to_metadata()).await
    }

    fn status(&self) -> PluginStatus {
        *self.status.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
