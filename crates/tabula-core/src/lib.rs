pub mod kernel;
pub mod plugin_system;

pub use kernel::error::{Error, Result};
pub use plugin_system::{
    DependencyConfig, DependencyResolver, DependencySpec, FormatCatalog, FormatManager, FormatManifest,
    ManifestPlugin, PluginRegistry, PluginStatus, StaticVersionSource, TableFormatPlugin, ValidationResult,
    VersionSource,
};
