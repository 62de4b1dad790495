//! # Tabula Plugin System Errors
//!
//! Defines error types specific to the plugin system.
//!
//! [`PluginSystemError`] covers registry lookups and lifecycle transitions.
//! Errors raised by a plugin's own actions are [`PluginError`] values and are
//! wrapped as the `source` of the matching lifecycle variant.
use crate::plugin_system::lifecycle::PluginStatus;
use crate::plugin_system::traits::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin {plugin_id} not found")]
    NotFound { plugin_id: String },

    #[error("Plugin {plugin_id} is already registered")]
    AlreadyRegistered { plugin_id: String },

    #[error("Invalid status transition for plugin {plugin_id}: {from} -> {to}")]
    InvalidTransition {
        plugin_id: String,
        from: PluginStatus,
        to: PluginStatus,
    },

    #[error("Failed to initialize plugin {plugin_id}: {source}")]
    InitializationError {
        plugin_id: String,
        #[source]
        source: PluginError,
    },

    #[error("Failed to shutdown plugin {plugin_id}: {source}")]
    ShutdownError {
        plugin_id: String,
        #[source]
        source: PluginError,
    },
}

impl PluginSystemError {
    pub fn not_found(plugin_id: &str) -> Self {
        PluginSystemError::NotFound {
            plugin_id: plugin_id.to_string(),
        }
    }

    /// Id of the plugin the error is about
    pub fn plugin_id(&self) -> &str {
        match self {
            PluginSystemError::NotFound { plugin_id }
            | PluginSystemError::AlreadyRegistered { plugin_id }
            | PluginSystemError::InvalidTransition { plugin_id, .. }
            | PluginSystemError::InitializationError { plugin_id, .. }
            | PluginSystemError::ShutdownError { plugin_id, .. } => plugin_id,
        }
    }
}
