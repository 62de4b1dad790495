use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::plugin_system::version::{VersionError, VersionRange};

/// Whether an unmet dependency blocks validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Failure makes the plugin invalid
    #[default]
    Required,
    /// Failure is reported as a warning
    Optional,
}

impl DependencyType {
    /// Capitalized label used in validation messages
    pub fn label(self) -> &'static str {
        match self {
            DependencyType::Required => "Required",
            DependencyType::Optional => "Optional",
        }
    }
}

/// When a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    /// Checked during runtime validation
    #[default]
    Runtime,
    /// Only needed by test suites; skipped during runtime validation
    Test,
}

/// Represents a dependency of a plugin on an installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// The package name
    pub name: String,

    /// The version requirement, e.g. ">=1.20.0"
    pub version: String,

    /// Whether this is a hard requirement or an optional one
    #[serde(default, rename = "type")]
    pub dep_type: DependencyType,

    /// Runtime or test-only dependency
    #[serde(default)]
    pub scope: DependencyScope,
}

impl DependencySpec {
    /// Create a new required runtime dependency
    pub fn required(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            dep_type: DependencyType::Required,
            scope: DependencyScope::Runtime,
        }
    }

    /// Create a new optional runtime dependency
    pub fn optional(name: &str, version: &str) -> Self {
        Self {
            dep_type: DependencyType::Optional,
            ..Self::required(name, version)
        }
    }

    pub fn with_scope(mut self, scope: DependencyScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn is_required(&self) -> bool {
        self.dep_type == DependencyType::Required
    }

    pub fn is_runtime(&self) -> bool {
        self.scope == DependencyScope::Runtime
    }

    /// Parse the version requirement
    pub fn range(&self) -> Result<VersionRange, VersionError> {
        VersionRange::from_constraint(&self.version)
    }

    /// Check whether `version` satisfies this dependency's requirement
    pub fn is_satisfied_by(&self, version: &Version) -> Result<bool, VersionError> {
        Ok(self.range()?.includes(version))
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requirement_type = match self.dep_type {
            DependencyType::Required => "Requires",
            DependencyType::Optional => "Optional",
        };
        let scope = match self.scope {
            DependencyScope::Runtime => "runtime",
            DependencyScope::Test => "test",
        };
        write!(f, "{} {} ({}, {})", requirement_type, self.name, self.version, scope)
    }
}
