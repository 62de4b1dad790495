use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use tabula_core::plugin_system::{
    DependencyConfig, FormatCatalog, FormatManager, ManifestPlugin, StaticVersionSource, TableFormatPlugin,
    TimeoutVersionSource, ValidationResult, VersionSource,
};
use tabula_core::{Error, Result};

pub fn load_config(path: Option<&Path>) -> Result<DependencyConfig> {
    match path {
        Some(path) => {
            info!("Loading dependency configuration from {}", path.display());
            Ok(DependencyConfig::from_path(path)?)
        }
        None => Ok(DependencyConfig::default()),
    }
}

fn version_source(config: &DependencyConfig, installed: Option<&Path>) -> Result<Arc<dyn VersionSource>> {
    let packages = match installed {
        Some(path) => StaticVersionSource::from_path(path)?,
        None => StaticVersionSource::new(),
    };
    debug!("{} installed packages known", packages.len());
    Ok(Arc::new(TimeoutVersionSource::new(packages, config.lookup_timeout())))
}

fn load_catalog(path: &Path) -> Result<FormatCatalog> {
    let catalog = FormatCatalog::from_path(path)?;
    if catalog.is_empty() {
        return Err(Error::Other(format!("Catalog {} declares no formats", path.display())));
    }
    Ok(catalog)
}

fn print_result(label: &str, result: &ValidationResult) {
    let verdict = if result.is_valid { "ok" } else { "FAILED" };
    println!("{}: {}", label, verdict);
    for error in &result.errors {
        println!("  error: {}", error);
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
}

/// Register every catalog entry with a fresh manager
async fn register_catalog(manager: &FormatManager, catalog: FormatCatalog) -> bool {
    let mut all_valid = true;
    for manifest in catalog.formats {
        let label = format!("{} v{}", manifest.id, manifest.version);
        let plugin: Arc<dyn TableFormatPlugin> = Arc::new(ManifestPlugin::new(manifest, manager.resolver()));
        let result = manager.register_plugin(plugin).await;
        print_result(&label, &result);
        all_valid &= result.is_valid;
    }
    all_valid
}

pub async fn check(config: &DependencyConfig, catalog: &Path, installed: Option<&Path>) -> Result<bool> {
    let catalog = load_catalog(catalog)?;
    let manager = FormatManager::new(config.clone(), version_source(config, installed)?);
    let all_valid = register_catalog(&manager, catalog).await;
    println!("{} formats registered", manager.plugin_count().await);
    Ok(all_valid)
}

pub async fn resolve(config: &DependencyConfig, catalog: &Path) -> Result<bool> {
    let catalog = load_catalog(catalog)?;
    let manager = FormatManager::new(config.clone(), version_source(config, None)?);
    let result = manager.resolver().resolve_dependencies(&catalog.metadata()).await;
    print_result("resolution", &result);
    Ok(result.is_valid)
}

pub async fn activate(config: &DependencyConfig, catalog: &Path, installed: Option<&Path>) -> Result<bool> {
    let catalog = load_catalog(catalog)?;
    let manager = FormatManager::new(config.clone(), version_source(config, installed)?);
    let mut all_valid = register_catalog(&manager, catalog).await;

    for id in &manager.plugin_ids().await {
        if let Err(e) = manager.try_initialize(id).await {
            println!("{}: {}", id, e);
            all_valid = false;
        }
    }
    println!("active formats: {}", manager.active_formats().await.join(", "));

    if let Err(failures) = manager.dispose().await {
        for failure in failures {
            println!("{}", failure);
        }
        all_valid = false;
    }
    Ok(all_valid)
}
