use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::plugin_system::config::DependencyConfig;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::introspection::VersionSource;
use crate::plugin_system::metadata::{DiagnosticResult, PluginMetadata};
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::resolver::DependencyResolver;
use crate::plugin_system::traits::TableFormatPlugin;
use crate::plugin_system::validation::ValidationResult;

/// Shared handle over one registry and its dependency resolver.
///
/// Clones share state. Every mutating call holds the registry lock for its
/// whole duration, so operations on one manager never interleave.
#[derive(Clone)]
pub struct FormatManager {
    registry: Arc<Mutex<PluginRegistry>>,
    resolver: Arc<DependencyResolver>,
}

impl FormatManager {
    pub fn new(config: DependencyConfig, source: Arc<dyn VersionSource>) -> Self {
        Self::with_resolver(Arc::new(DependencyResolver::new(config, source)))
    }

    pub fn with_resolver(resolver: Arc<DependencyResolver>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(PluginRegistry::new())),
            resolver,
        }
    }

    /// The resolver shared with plugins built by this manager
    pub fn resolver(&self) -> Arc<DependencyResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn registry(&self) -> &Arc<Mutex<PluginRegistry>> {
        &self.registry
    }

    pub async fn register_plugin(&self, plugin: Arc<dyn TableFormatPlugin>) -> ValidationResult {
        self.registry.lock().await.register_plugin(plugin).await
    }

    pub async fn initialize_plugin(&self, id: &str) -> ValidationResult {
        self.registry.lock().await.initialize_plugin(id).await
    }

    pub async fn try_initialize(&self, id: &str) -> Result<(), PluginSystemError> {
        self.registry.lock().await.try_initialize(id).await
    }

    pub async fn shutdown_plugin(&self, id: &str) -> ValidationResult {
        self.registry.lock().await.shutdown_plugin(id).await
    }

    pub async fn try_shutdown(&self, id: &str) -> Result<(), PluginSystemError> {
        self.registry.lock().await.try_shutdown(id).await
    }

    pub async fn get_plugin(&self, id: &str) -> Option<Arc<dyn TableFormatPlugin>> {
        self.registry.lock().await.get_plugin(id)
    }

    pub async fn get_plugin_metadata(&self, id: &str) -> Option<PluginMetadata> {
        self.registry.lock().await.get_plugin_metadata(id)
    }

    pub async fn metadata(&self) -> HashMap<String, PluginMetadata> {
        self.registry.lock().await.metadata()
    }

    pub async fn active_formats(&self) -> Vec<String> {
        self.registry.lock().await.active_formats()
    }

    /// Registered plugin ids in registration order
    pub async fn plugin_ids(&self) -> Vec<String> {
        self.registry.lock().await.plugin_ids()
    }

    pub async fn plugin_count(&self) -> usize {
        self.registry.lock().await.plugin_count()
    }

    pub async fn run_diagnostics(&self, id: &str) -> Result<DiagnosticResult, PluginSystemError> {
        self.registry.lock().await.run_diagnostics(id).await
    }

    /// Cross-plugin resolution over everything registered so far
    pub async fn resolve_registered(&self) -> ValidationResult {
        let metadata = self.registry.lock().await.registered_metadata();
        self.resolver.resolve_dependencies(&metadata).await
    }

    /// Shut down every active plugin and drop cached validations
    pub async fn dispose(&self) -> Result<(), Vec<PluginSystemError>> {
        info!("Disposing format manager");
        let result = self.registry.lock().await.shutdown_all().await;
        self.resolver.clear_cache().await;
        result
    }
}

impl Debug for FormatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatManager")
            .field("config", self.resolver.config())
            .finish_non_exhaustive()
    }
}
