//! # Dependency Resolver
//!
//! Validates the runtime dependencies of a single plugin against a
//! [`VersionSource`] and resolves version requirements shared by several
//! plugins.
//!
//! Single-plugin validation results are cached per `(plugin id, plugin
//! version)` for the configured TTL. Cross-plugin resolution is always
//! recomputed, since the plugin set is chosen by the caller.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::kernel::constants::RESOLVER_COMPONENT;
use crate::plugin_system::config::DependencyConfig;
use crate::plugin_system::dependency::{DependencySpec, DependencyType};
use crate::plugin_system::introspection::VersionSource;
use crate::plugin_system::metadata::PluginMetadata;
use crate::plugin_system::validation::{ErrorCode, ErrorReport, ValidationResult};
use crate::plugin_system::version::{VersionError, VersionRange, merge_ranges};

type CacheKey = (String, String);

#[derive(Debug, Clone)]
struct CachedValidation {
    result: ValidationResult,
    computed_at: Instant,
}

/// Outcome of checking one dependency
enum Finding {
    Satisfied,
    Warning(String),
    Error(ErrorReport),
}

/// One plugin's declaration of a shared dependency
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Declaration {
    plugin_id: String,
    requirement: String,
    dep_type: DependencyTypeKey,
}

// DependencyType has no ordering of its own; this keeps declarations sortable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DependencyTypeKey {
    Required,
    Optional,
}

impl From<DependencyType> for DependencyTypeKey {
    fn from(dep_type: DependencyType) -> Self {
        match dep_type {
            DependencyType::Required => DependencyTypeKey::Required,
            DependencyType::Optional => DependencyTypeKey::Optional,
        }
    }
}

pub struct DependencyResolver {
    config: DependencyConfig,
    source: Arc<dyn VersionSource>,
    validation_cache: Mutex<HashMap<CacheKey, CachedValidation>>,
}

impl DependencyResolver {
    pub fn new(config: DependencyConfig, source: Arc<dyn VersionSource>) -> Self {
        Self {
            config,
            source,
            validation_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolver with the default configuration
    pub fn with_source(source: Arc<dyn VersionSource>) -> Self {
        Self::new(DependencyConfig::default(), source)
    }

    pub fn config(&self) -> &DependencyConfig {
        &self.config
    }

    /// Validate every runtime dependency of a plugin.
    ///
    /// Test-scope dependencies are skipped. A failure on one dependency never
    /// stops the others from being checked; all problems are aggregated.
    pub async fn validate_dependencies(&self, metadata: &PluginMetadata) -> ValidationResult {
        let key = (metadata.id().to_string(), metadata.version().to_string());
        if let Some(cached) = self.cached_result(&key).await {
            debug!("Using cached dependency validation for {} v{}", key.0, key.1);
            return cached;
        }

        let mut reports = Vec::new();
        let mut warnings = Vec::new();
        for spec in metadata.dependencies.values() {
            if !spec.is_runtime() {
                debug!("Skipping test dependency {} of {}", spec.name, metadata.id());
                continue;
            }
            match self.check_dependency(metadata.id(), spec).await {
                Finding::Satisfied => {}
                Finding::Warning(message) => {
                    warn!("{}: {}", metadata.id(), message);
                    warnings.push(message);
                }
                Finding::Error(report) => {
                    warn!("{}: {}", metadata.id(), report.message);
                    reports.push(report);
                }
            }
        }

        let result = ValidationResult::from_reports(reports, warnings);
        self.validation_cache.lock().await.insert(
            key,
            CachedValidation {
                result: result.clone(),
                computed_at: Instant::now(),
            },
        );
        result
    }

    /// Drop the cached validation of one plugin version
    pub async fn invalidate(&self, plugin_id: &str, version: &str) -> bool {
        self.validation_cache
            .lock()
            .await
            .remove(&(plugin_id.to_string(), version.to_string()))
            .is_some()
    }

    pub async fn clear_cache(&self) {
        self.validation_cache.lock().await.clear();
    }

    pub async fn cached_entries(&self) -> usize {
        self.validation_cache.lock().await.len()
    }

    // The freshness check and the clone happen under the same guard.
    async fn cached_result(&self, key: &CacheKey) -> Option<ValidationResult> {
        let cache = self.validation_cache.lock().await;
        let entry = cache.get(key)?;
        (entry.computed_at.elapsed() < self.config.cache_ttl()).then(|| entry.result.clone())
    }

    /// Optional dependencies only fail validation when configured to
    fn enforced(&self, spec: &DependencySpec) -> bool {
        spec.is_required() || !self.config.ignore_optional
    }

    async fn check_dependency(&self, plugin_id: &str, spec: &DependencySpec) -> Finding {
        let installed = match self.source.installed_version(&spec.name).await {
            Ok(installed) => installed,
            Err(e) => return Finding::Error(validation_failure(plugin_id, spec, &e.to_string())),
        };

        let Some(installed) = installed else {
            if !self.enforced(spec) {
                return Finding::Warning(format!("Optional dependency {} is not installed", spec.name));
            }
            return Finding::Error(
                ErrorReport::new(
                    ErrorCode::MissingDependency,
                    plugin_id,
                    format!("{} dependency {} is not installed", spec.dep_type.label(), spec.name),
                )
                .with_context("operation", "dependency_validation")
                .with_context("dependency", spec.name.as_str())
                .with_context("required_version", spec.version.as_str())
                .with_context("found_version", Value::Null)
                .with_resolution(format!("Install {} version {}", spec.name, spec.version))
                .with_resolution("Check package repository accessibility"),
            );
        };

        let satisfied = match spec.is_satisfied_by(&installed) {
            Ok(satisfied) => satisfied,
            Err(e) => return Finding::Error(validation_failure(plugin_id, spec, &e.to_string())),
        };
        if satisfied {
            debug!("{}: {} {} satisfies {}", plugin_id, spec.name, installed, spec.version);
            return Finding::Satisfied;
        }

        if !self.enforced(spec) {
            return Finding::Warning(format!(
                "Optional dependency {} version {} does not match requirement {}",
                spec.name, installed, spec.version
            ));
        }
        Finding::Error(
            ErrorReport::new(
                ErrorCode::VersionMismatch,
                plugin_id,
                format!("Incompatible version for {}", spec.name),
            )
            .with_context("operation", "dependency_validation")
            .with_context("dependency", spec.name.as_str())
            .with_context("required_version", spec.version.as_str())
            .with_context("found_version", installed.to_string())
            .with_resolution(format!("Upgrade {} to version {}", spec.name, spec.version))
            .with_resolution(format!(
                "Or downgrade plugin to version compatible with {} {}",
                spec.name, installed
            )),
        )
    }

    /// Check that requirements shared by several plugins can be satisfied
    /// together.
    ///
    /// Dependencies of every scope are considered. A name with a single
    /// distinct requirement is never a conflict. Nothing is cached.
    pub async fn resolve_dependencies(&self, plugins: &[PluginMetadata]) -> ValidationResult {
        let mut declarations: BTreeMap<String, BTreeSet<Declaration>> = BTreeMap::new();
        for plugin in plugins {
            for (name, spec) in &plugin.dependencies {
                declarations.entry(name.clone()).or_default().insert(Declaration {
                    plugin_id: plugin.id().to_string(),
                    requirement: spec.version.trim().to_string(),
                    dep_type: spec.dep_type.into(),
                });
            }
        }

        let mut reports = Vec::new();
        let mut warnings = Vec::new();
        for (name, group) in &declarations {
            if group.len() < 2 {
                continue;
            }
            let distinct: BTreeSet<&str> = group.iter().map(|d| d.requirement.as_str()).collect();
            if distinct.len() < 2 {
                continue;
            }

            match merge_declarations(group) {
                Ok(Some(merged)) => {
                    debug!("Requirements for {} merged into '{}'", name, merged);
                }
                Ok(None) => {
                    let report = incompatible_requirements(name, group);
                    let all_optional = group.iter().all(|d| d.dep_type == DependencyTypeKey::Optional);
                    if all_optional && self.config.ignore_optional {
                        warn!("Optional requirements for {} cannot be satisfied together", name);
                        warnings.push(report.to_string());
                    } else {
                        warn!("Conflicting requirements for {}", name);
                        reports.push(report);
                    }
                }
                Err(e) => {
                    warn!("Could not merge requirements for {}: {}", name, e);
                    reports.push(resolution_failure(name, &e));
                }
            }
        }

        let result = ValidationResult::from_reports(reports, warnings);
        info!(
            "Resolved dependencies across {} plugins: {} errors, {} warnings",
            plugins.len(),
            result.errors.len(),
            result.warnings.len()
        );
        result
    }
}

fn merge_declarations(group: &BTreeSet<Declaration>) -> Result<Option<VersionRange>, VersionError> {
    let ranges = group
        .iter()
        .map(|d| VersionRange::from_constraint(&d.requirement))
        .collect::<Result<Vec<_>, _>>()?;
    merge_ranges(&ranges)
}

fn validation_failure(plugin_id: &str, spec: &DependencySpec, error: &str) -> ErrorReport {
    ErrorReport::new(
        ErrorCode::ValidationFailure,
        plugin_id,
        format!("Error validating dependency {}", spec.name),
    )
    .with_context("operation", "dependency_validation")
    .with_context("dependency", spec.name.as_str())
    .with_context("error", error)
    .with_resolution("Check package name and version format")
    .with_resolution("Verify package manager is functioning")
}

fn incompatible_requirements(name: &str, group: &BTreeSet<Declaration>) -> ErrorReport {
    let pairs = group
        .iter()
        .map(|d| format!("{} ({})", d.plugin_id, d.requirement))
        .collect::<Vec<_>>()
        .join(", ");
    let requirements: Vec<Value> = group
        .iter()
        .map(|d| json!({ "plugin": d.plugin_id, "version": d.requirement }))
        .collect();
    let plugins: BTreeSet<&str> = group.iter().map(|d| d.plugin_id.as_str()).collect();

    ErrorReport::new(
        ErrorCode::IncompatibleRequirements,
        RESOLVER_COMPONENT,
        format!("Incompatible version requirements for {}", name),
    )
    .with_context("operation", "dependency_resolution")
    .with_context("dependency", name)
    .with_context("requirements", requirements)
    .with_context("plugins", plugins.into_iter().collect::<Vec<_>>())
    .with_resolution(format!("Resolve version conflict for {} between plugins: {}", name, pairs))
    .with_resolution("Consider updating plugins to use compatible versions")
}

fn resolution_failure(name: &str, error: &VersionError) -> ErrorReport {
    ErrorReport::new(
        ErrorCode::ResolutionFailure,
        RESOLVER_COMPONENT,
        format!("Error resolving versions for {}", name),
    )
    .with_context("operation", "dependency_resolution")
    .with_context("dependency", name)
    .with_context("error", error.to_string())
    .with_resolution("Check version requirement format")
    .with_resolution("Verify all version specifications are valid")
}
