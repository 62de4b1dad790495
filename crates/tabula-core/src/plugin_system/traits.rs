use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::constants::TABLE_FORMAT_INTERFACE;
use crate::plugin_system::conflict::check_dependency_compatibility;
use crate::plugin_system::dependency::DependencySpec;
use crate::plugin_system::lifecycle::PluginStatus;
use crate::plugin_system::metadata::{CompatibilityResult, DiagnosticResult, PluginIdentity};
use crate::plugin_system::validation::ValidationResult;

/// Error type for plugin operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin initialization error: {0}")]
    InitError(String),
    #[error("Plugin shutdown error: {0}")]
    ShutdownError(String),
}

/// Core trait that every table-format plugin implements.
///
/// The registry only ever holds plugins as `Arc<dyn TableFormatPlugin>`.
#[async_trait]
pub trait TableFormatPlugin: Send + Sync {
    /// Unique identifier, used as the registry key
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(self.id(), self.name(), self.version())
    }

    /// Capability names this plugin provides
    fn interfaces(&self) -> Vec<String> {
        vec![TABLE_FORMAT_INTERFACE.to_string()]
    }

    /// Bring the plugin into service
    async fn initialize(&self) -> Result<(), PluginError>;

    /// Take the plugin out of service
    async fn shutdown(&self) -> Result<(), PluginError>;

    /// Declared package dependencies
    fn dependencies(&self) -> Vec<DependencySpec> {
        Vec::new()
    }

    /// Check the declared dependencies against the environment.
    ///
    /// The default accepts everything; plugins backed by a resolver delegate
    /// to it.
    async fn validate_dependencies(&self) -> ValidationResult {
        ValidationResult::valid()
    }

    /// Check this plugin against plugins that are already registered
    async fn check_version_compatibility(
        &self,
        others: &[Arc<dyn TableFormatPlugin>],
    ) -> CompatibilityResult {
        check_dependency_compatibility(self.id(), &self.dependencies(), others)
    }

    /// Status as seen by the plugin itself
    fn status(&self) -> PluginStatus;

    async fn run_diagnostics(&self) -> DiagnosticResult {
        DiagnosticResult::new(self.status())
            .with_detail("plugin_id", self.id())
            .with_detail("version", self.version())
    }
}
