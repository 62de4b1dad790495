use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::lifecycle::{LifecycleTracker, PluginStatus};
use crate::plugin_system::metadata::{DiagnosticResult, PluginMetadata};
use crate::plugin_system::traits::TableFormatPlugin;
use crate::plugin_system::validation::ValidationResult;

/// Registry for managing table-format plugins
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn TableFormatPlugin>>,
    /// Plugin ids in registration order
    registration_order: Vec<String>,
    lifecycle: LifecycleTracker,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a plugin.
    ///
    /// The plugin is stored only if its id is unused, it is compatible with
    /// every registered plugin and its dependencies validate. A rejected
    /// plugin leaves the registry untouched.
    pub async fn register_plugin(&mut self, plugin: Arc<dyn TableFormatPlugin>) -> ValidationResult {
        let id = plugin.id().to_string();
        if self.plugins.contains_key(&id) {
            warn!("Rejected plugin {}: already registered", id);
            return ValidationResult::invalid(vec![
                PluginSystemError::AlreadyRegistered { plugin_id: id }.to_string(),
            ]);
        }

        let registered = self.plugins();
        let compatibility = plugin.check_version_compatibility(&registered).await;
        if !compatibility.is_compatible {
            warn!("Rejected plugin {}: incompatible with registered plugins", id);
            return ValidationResult::invalid(vec![format!(
                "Version compatibility check failed: {}",
                compatibility.describe_conflicts()
            )]);
        }

        let validation = plugin.validate_dependencies().await;
        if !validation.is_valid {
            warn!(
                "Rejected plugin {}: {} dependency errors",
                id,
                validation.errors.len()
            );
            return validation;
        }

        let metadata = PluginMetadata::new(plugin.identity())
            .with_interfaces(plugin.interfaces())
            .with_dependencies(plugin.dependencies());
        if let Err(e) = self.lifecycle.admit(metadata) {
            return ValidationResult::invalid(vec![e.to_string()]);
        }
        self.plugins.insert(id.clone(), plugin);
        self.registration_order.push(id.clone());
        info!("Registered plugin {}", id);

        ValidationResult::valid().with_warnings(validation.warnings)
    }

    /// Initialize a registered plugin, reporting failure as a result value
    pub async fn initialize_plugin(&mut self, id: &str) -> ValidationResult {
        match self.try_initialize(id).await {
            Ok(()) => ValidationResult::valid(),
            Err(e) => ValidationResult::invalid(vec![e.to_string()]),
        }
    }

    /// Initialize a registered plugin.
    ///
    /// An already active plugin is left alone. A failed initialization moves
    /// the plugin to `Error` for good, as does dropping the returned future
    /// before the plugin finishes initializing.
    pub async fn try_initialize(&mut self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self
            .plugins
            .get(id)
            .cloned()
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        if self.lifecycle.is_active(id) {
            debug!("Plugin {} is already active", id);
            return Ok(());
        }

        let pending = self.lifecycle.start_initialize(id)?;
        info!("Initializing plugin {}", id);
        match plugin.initialize().await {
            Ok(()) => {
                pending.complete()?;
                info!("Plugin {} is active", id);
                Ok(())
            }
            Err(source) => {
                error!("Failed to initialize plugin {}: {}", id, source);
                pending.fail()?;
                Err(PluginSystemError::InitializationError {
                    plugin_id: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Shut down a plugin, reporting failure as a result value
    pub async fn shutdown_plugin(&mut self, id: &str) -> ValidationResult {
        match self.try_shutdown(id).await {
            Ok(()) => ValidationResult::valid(),
            Err(e) => ValidationResult::invalid(vec![e.to_string()]),
        }
    }

    /// Shut down an active plugin.
    ///
    /// A plugin that is merely registered is left alone. If the plugin's own
    /// shutdown fails its status does not change.
    pub async fn try_shutdown(&mut self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self
            .plugins
            .get(id)
            .cloned()
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        match self.lifecycle.status(id) {
            Some(PluginStatus::Registered) => {
                debug!("Plugin {} is not active, nothing to shut down", id);
                return Ok(());
            }
            Some(PluginStatus::Active) => {}
            Some(other) => {
                return Err(PluginSystemError::InvalidTransition {
                    plugin_id: id.to_string(),
                    from: other,
                    to: PluginStatus::Registered,
                });
            }
            None => return Err(PluginSystemError::not_found(id)),
        }

        info!("Shutting down plugin {}", id);
        plugin.shutdown().await.map_err(|source| {
            error!("Failed to shut down plugin {}: {}", id, source);
            PluginSystemError::ShutdownError {
                plugin_id: id.to_string(),
                source,
            }
        })?;
        self.lifecycle.complete_shutdown(id)
    }

    /// Shut down every active plugin, most recently activated first.
    ///
    /// Every plugin is attempted; the failures are returned together.
    pub async fn shutdown_all(&mut self) -> Result<(), Vec<PluginSystemError>> {
        let mut failures = Vec::new();
        let active: Vec<String> = self.lifecycle.active_formats().to_vec();
        for id in active.iter().rev() {
            if let Err(e) = self.try_shutdown(id).await {
                failures.push(e);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    pub async fn run_diagnostics(&self, id: &str) -> Result<DiagnosticResult, PluginSystemError> {
        let plugin = self
            .plugins
            .get(id)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        let mut diagnostics = plugin.run_diagnostics().await;
        if let Some(status) = self.lifecycle.status(id) {
            diagnostics
                .details
                .insert("registry_status".to_string(), status.to_string().into());
        }
        Ok(diagnostics)
    }

    pub fn get_plugin(&self, id: &str) -> Option<Arc<dyn TableFormatPlugin>> {
        self.plugins.get(id).cloned()
    }

    pub fn get_plugin_metadata(&self, id: &str) -> Option<PluginMetadata> {
        self.lifecycle.get(id).cloned()
    }

    pub fn get_status(&self, id: &str) -> Option<PluginStatus> {
        self.lifecycle.status(id)
    }

    /// Registered plugins in registration order
    pub fn plugins(&self) -> Vec<Arc<dyn TableFormatPlugin>> {
        self.registration_order
            .iter()
            .filter_map(|id| self.plugins.get(id).cloned())
            .collect()
    }

    /// Copy of the metadata table keyed by plugin id
    pub fn metadata(&self) -> HashMap<String, PluginMetadata> {
        self.lifecycle.metadata_snapshot()
    }

    /// Metadata of every registered plugin in registration order
    pub fn registered_metadata(&self) -> Vec<PluginMetadata> {
        self.registration_order
            .iter()
            .filter_map(|id| self.lifecycle.get(id).cloned())
            .collect()
    }

    /// Active plugin ids in activation order
    pub fn active_formats(&self) -> Vec<String> {
        self.lifecycle.active_formats().to_vec()
    }

    pub fn plugin_ids(&self) -> Vec<String> {
        self.registration_order.clone()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }
}
