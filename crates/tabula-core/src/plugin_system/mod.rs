//! # Tabula Plugin System
//!
//! Registers table-format plugins, validates their package dependencies and
//! drives each plugin through its status lifecycle.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`traits`]**: The [`TableFormatPlugin`] trait every plugin implements,
//!   and [`PluginError`] for failures raised by a plugin itself.
//! - **[`registry`]**: The [`PluginRegistry`], which admits plugins and owns
//!   their instances.
//! - **[`lifecycle`]**: The status state machine and the list of active
//!   formats.
//! - **[`resolver`]**: The [`DependencyResolver`], which checks installed
//!   package versions with a TTL cache and detects requirement conflicts
//!   across plugins.
//! - **[`introspection`]**: The [`VersionSource`] abstraction over installed
//!   packages.
//! - **[`conflict`]**: Pairwise dependency conflicts used by the default
//!   compatibility check.
//! - **[`version`]**: Version parsing and requirement intersection.
//! - **[`manager`]**: [`FormatManager`], a cloneable shared handle.
//! - **[`manifest`]**: Declarative format manifests and catalogs.
//! - **[`config`]**: [`DependencyConfig`] and file loading.
pub mod config;
pub mod conflict;
pub mod dependency;
pub mod error;
pub mod introspection;
pub mod lifecycle;
pub mod manager;
pub mod manifest;
pub mod metadata;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod validation;
pub mod version;

pub use config::{ConfigFormat, DependencyConfig};
pub use dependency::{DependencyScope, DependencySpec, DependencyType};
pub use error::PluginSystemError;
pub use introspection::{StaticVersionSource, TimeoutVersionSource, VersionLookupError, VersionSource};
pub use lifecycle::PluginStatus;
pub use manager::FormatManager;
pub use manifest::{FormatCatalog, FormatManifest, ManifestPlugin};
pub use metadata::{CompatibilityResult, DiagnosticResult, PluginIdentity, PluginMetadata};
pub use registry::PluginRegistry;
pub use resolver::DependencyResolver;
pub use traits::{PluginError, TableFormatPlugin};
pub use validation::{ErrorCode, ErrorReport, Severity, ValidationResult};
pub use version::{VersionError, VersionRange};

#[cfg(test)]
mod tests;
