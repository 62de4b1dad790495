use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugin_system::dependency::DependencySpec;
use crate::plugin_system::lifecycle::PluginStatus;

/// Immutable identity of a plugin. `id` is the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub id: String,
    pub name: String,
    pub version: String,
}

impl PluginIdentity {
    pub fn new(id: &str, name: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

impl fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} v{})", self.id, self.name, self.version)
    }
}

/// Registry-owned record describing a registered plugin.
///
/// The status field is only changed through lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginMetadata {
    pub identity: PluginIdentity,
    status: PluginStatus,
    /// Capability names declared by the plugin
    pub interfaces: Vec<String>,
    /// Declared dependencies keyed by package name
    pub dependencies: BTreeMap<String, DependencySpec>,
}

impl PluginMetadata {
    pub fn new(identity: PluginIdentity) -> Self {
        Self {
            identity,
            status: PluginStatus::Registered,
            interfaces: Vec::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Attach dependencies. A later declaration of the same name wins.
    pub fn with_dependencies<I>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = DependencySpec>,
    {
        for dep in dependencies {
            self.dependencies.insert(dep.name.clone(), dep);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn version(&self) -> &str {
        &self.identity.version
    }

    pub fn status(&self) -> PluginStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: PluginStatus) {
        self.status = status;
    }
}

/// Result of a compatibility check against other plugins
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompatibilityResult {
    pub is_compatible: bool,
    /// One field -> value record per conflict
    pub conflicts: Vec<BTreeMap<String, String>>,
}

impl CompatibilityResult {
    pub fn compatible() -> Self {
        Self {
            is_compatible: true,
            conflicts: Vec::new(),
        }
    }

    pub fn from_conflicts(conflicts: Vec<BTreeMap<String, String>>) -> Self {
        Self {
            is_compatible: conflicts.is_empty(),
            conflicts,
        }
    }

    /// Renders the conflict records as `key=value` lists separated by `; `
    pub fn describe_conflicts(&self) -> String {
        self.conflicts
            .iter()
            .map(|record| {
                record
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Result of plugin diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    pub status: PluginStatus,
    pub details: BTreeMap<String, Value>,
    pub timestamp: SystemTime,
}

impl DiagnosticResult {
    pub fn new(status: PluginStatus) -> Self {
        Self {
            status,
            details: BTreeMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}
