use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::support::CountingSource;
use crate::plugin_system::config::DependencyConfig;
use crate::plugin_system::dependency::{DependencyScope, DependencySpec};
use crate::plugin_system::introspection::{StaticVersionSource, TimeoutVersionSource};
use crate::plugin_system::metadata::{PluginIdentity, PluginMetadata};
use crate::plugin_system::resolver::DependencyResolver;
use crate::plugin_system::validation::ErrorCode;

fn metadata(id: &str, deps: Vec<DependencySpec>) -> PluginMetadata {
    PluginMetadata::new(PluginIdentity::new(id, id, "1.0.0")).with_dependencies(deps)
}

fn resolver_with(source: Arc<CountingSource>) -> DependencyResolver {
    DependencyResolver::with_source(source)
}

#[tokio::test]
async fn test_no_dependencies_is_valid() {
    let source = Arc::new(CountingSource::new());
    let resolver = resolver_with(source.clone());

    let result = resolver.validate_dependencies(&metadata("parquet", vec![])).await;
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(source.lookups(), 0);
}

#[tokio::test]
async fn test_test_scope_dependencies_are_skipped() {
    let source = Arc::new(CountingSource::new());
    let resolver = resolver_with(source.clone());
    let pytest = DependencySpec::required("pytest", ">=7.0.0").with_scope(DependencyScope::Test);

    let result = resolver.validate_dependencies(&metadata("parquet", vec![pytest])).await;
    assert!(result.is_valid, "test-only dependency must not be validated: {:?}", result.errors);
    assert_eq!(source.lookups(), 0);
}

#[tokio::test]
async fn test_satisfied_dependency_is_valid() {
    let source = Arc::new(CountingSource::new().with_package("numpy", "1.24.0"));
    let resolver = resolver_with(source);

    let result = resolver
        .validate_dependencies(&metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]))
        .await;
    assert!(result.is_valid);
}

#[tokio::test]
async fn test_missing_required_dependency_reports_dep001() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));

    let result = resolver
        .validate_dependencies(&metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]))
        .await;
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    let report = &result.reports[0];
    assert_eq!(report.code, ErrorCode::MissingDependency);
    assert_eq!(report.component, "parquet");
    assert_eq!(report.message, "Required dependency numpy is not installed");
    assert_eq!(report.context["found_version"], json!(null));
    assert_eq!(report.context["required_version"], json!(">=1.20.0"));
    assert_eq!(report.resolution[0], "Install numpy version >=1.20.0");
    assert!(result.errors[0].starts_with("[DEP001]"));
}

#[tokio::test]
async fn test_version_mismatch_reports_dep002() {
    let resolver = resolver_with(Arc::new(CountingSource::new().with_package("numpy", "1.19.5")));

    let result = resolver
        .validate_dependencies(&metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]))
        .await;
    assert!(!result.is_valid);
    let report = &result.reports[0];
    assert_eq!(report.code, ErrorCode::VersionMismatch);
    assert_eq!(report.context["found_version"], json!("1.19.5"));
    assert_eq!(report.resolution.len(), 2);
}

#[tokio::test]
async fn test_lookup_failure_and_bad_requirement_report_dep003() {
    let source = Arc::new(
        CountingSource::new()
            .with_failure("arrow", "index unreachable")
            .with_package("pandas", "2.0.0"),
    );
    let resolver = resolver_with(source.clone());
    let deps = vec![
        DependencySpec::required("arrow", ">=10"),
        DependencySpec::required("pandas", "!=1.0"),
    ];

    let result = resolver.validate_dependencies(&metadata("delta", deps)).await;
    assert!(!result.is_valid);
    assert_eq!(result.reports.len(), 2, "one failure must not stop the others");
    assert!(result.reports.iter().all(|r| r.code == ErrorCode::ValidationFailure));
    assert!(result.reports.iter().any(|r| r.context["error"]
        .as_str()
        .is_some_and(|e| e.contains("index unreachable"))));
    assert_eq!(source.lookups(), 2);
}

#[tokio::test]
async fn test_optional_failures_are_warnings() {
    let source = Arc::new(CountingSource::new().with_package("pyarrow", "9.0.0"));
    let resolver = resolver_with(source);
    let deps = vec![
        DependencySpec::optional("fastparquet", ">=0.8"),
        DependencySpec::optional("pyarrow", ">=10.0"),
    ];

    let result = resolver.validate_dependencies(&metadata("parquet", deps)).await;
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert_eq!(
        result.warnings,
        vec![
            "Optional dependency fastparquet is not installed".to_string(),
            "Optional dependency pyarrow version 9.0.0 does not match requirement >=10.0".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_optional_failures_are_errors_when_not_ignored() {
    let config = DependencyConfig::default().with_ignore_optional(false);
    let resolver = DependencyResolver::new(config, Arc::new(CountingSource::new()));

    let result = resolver
        .validate_dependencies(&metadata("parquet", vec![DependencySpec::optional("fastparquet", ">=0.8")]))
        .await;
    assert!(!result.is_valid);
    assert_eq!(result.reports[0].code, ErrorCode::MissingDependency);
    assert_eq!(result.reports[0].message, "Optional dependency fastparquet is not installed");
}

#[tokio::test]
async fn test_validation_is_cached_within_ttl() {
    tokio::time::pause();
    let source = Arc::new(CountingSource::new().with_package("numpy", "1.24.0"));
    let resolver = resolver_with(source.clone());
    let meta = metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]);

    let first = resolver.validate_dependencies(&meta).await;
    let second = resolver.validate_dependencies(&meta).await;
    assert_eq!(first, second);
    assert_eq!(source.lookups(), 1, "second call must be served from the cache");
    assert_eq!(resolver.cached_entries().await, 1);

    tokio::time::advance(Duration::from_secs(3601)).await;
    resolver.validate_dependencies(&meta).await;
    assert_eq!(source.lookups(), 2, "stale entry must be recomputed");
}

#[tokio::test]
async fn test_cache_is_keyed_by_version() {
    let source = Arc::new(CountingSource::new().with_package("numpy", "1.24.0"));
    let resolver = resolver_with(source.clone());
    let deps = vec![DependencySpec::required("numpy", ">=1.20.0")];
    let v1 = metadata("parquet", deps.clone());
    let v2 = PluginMetadata::new(PluginIdentity::new("parquet", "parquet", "2.0.0")).with_dependencies(deps);

    resolver.validate_dependencies(&v1).await;
    resolver.validate_dependencies(&v2).await;
    assert_eq!(source.lookups(), 2);

    assert!(resolver.invalidate("parquet", "1.0.0").await);
    resolver.validate_dependencies(&v1).await;
    assert_eq!(source.lookups(), 3);

    resolver.clear_cache().await;
    assert_eq!(resolver.cached_entries().await, 0);
}

#[tokio::test]
async fn test_lookup_timeout_surfaces_as_dep003() {
    tokio::time::pause();
    let slow = CountingSource::new()
        .with_package("numpy", "1.24.0")
        .with_delay(Duration::from_secs(30));
    let source = Arc::new(TimeoutVersionSource::new(slow, Duration::from_secs(5)));
    let resolver = DependencyResolver::with_source(source);

    let result = resolver
        .validate_dependencies(&metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]))
        .await;
    assert!(!result.is_valid);
    assert_eq!(result.reports[0].code, ErrorCode::ValidationFailure);
    assert!(result.errors[0].contains("timed out"));
}

#[tokio::test]
async fn test_static_source_normalizes_names() {
    let source = Arc::new(StaticVersionSource::new().with_package("Scikit_Learn", "1.3"));
    let resolver = DependencyResolver::with_source(source);

    let result = resolver
        .validate_dependencies(&metadata("csv", vec![DependencySpec::required("scikit-learn", "~=1.2")]))
        .await;
    assert!(result.is_valid, "{:?}", result.errors);
}

#[tokio::test]
async fn test_identical_requirements_resolve() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));
    let plugins = vec![
        metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]),
        metadata("delta", vec![DependencySpec::required("numpy", ">=1.20.0")]),
    ];

    let result = resolver.resolve_dependencies(&plugins).await;
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_compatible_requirements_resolve() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));
    let plugins = vec![
        metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]),
        metadata("delta", vec![DependencySpec::required("numpy", "<2.0.0")]),
    ];

    assert!(resolver.resolve_dependencies(&plugins).await.is_valid);
}

#[tokio::test]
async fn test_conflicting_requirements_report_dep004() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));
    let plugins = vec![
        metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]),
        metadata("delta", vec![DependencySpec::required("numpy", "<1.20.0")]),
    ];

    let result = resolver.resolve_dependencies(&plugins).await;
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    let report = &result.reports[0];
    assert_eq!(report.code, ErrorCode::IncompatibleRequirements);
    assert_eq!(report.component, "dependency_resolver");
    assert_eq!(report.message, "Incompatible version requirements for numpy");
    assert_eq!(report.context["plugins"], json!(["delta", "parquet"]));
    assert_eq!(
        report.context["requirements"],
        json!([
            {"plugin": "delta", "version": "<1.20.0"},
            {"plugin": "parquet", "version": ">=1.20.0"},
        ])
    );
    assert!(result.errors[0].contains("parquet"));
    assert!(result.errors[0].contains("delta"));
}

#[tokio::test]
async fn test_unparseable_requirement_reports_dep005() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));
    let plugins = vec![
        metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")]),
        metadata("delta", vec![DependencySpec::required("numpy", "!=1.21.0")]),
    ];

    let result = resolver.resolve_dependencies(&plugins).await;
    assert!(!result.is_valid);
    assert_eq!(result.reports[0].code, ErrorCode::ResolutionFailure);
}

#[tokio::test]
async fn test_resolution_includes_test_scope() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));
    let plugins = vec![
        metadata(
            "parquet",
            vec![DependencySpec::required("pytest", ">=7").with_scope(DependencyScope::Test)],
        ),
        metadata(
            "delta",
            vec![DependencySpec::required("pytest", "<7").with_scope(DependencyScope::Test)],
        ),
    ];

    assert!(!resolver.resolve_dependencies(&plugins).await.is_valid);
}

#[tokio::test]
async fn test_optional_only_conflict_is_a_warning() {
    let resolver = resolver_with(Arc::new(CountingSource::new()));
    let plugins = vec![
        metadata("parquet", vec![DependencySpec::optional("pyarrow", ">=10")]),
        metadata("delta", vec![DependencySpec::optional("pyarrow", "<10")]),
    ];

    let result = resolver.resolve_dependencies(&plugins).await;
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("[DEP004]"));
}

#[tokio::test]
async fn test_resolution_is_not_cached() {
    let source = Arc::new(CountingSource::new());
    let resolver = resolver_with(source.clone());
    let plugins = vec![metadata("parquet", vec![DependencySpec::required("numpy", ">=1.20.0")])];

    resolver.resolve_dependencies(&plugins).await;
    assert_eq!(resolver.cached_entries().await, 0);
    assert_eq!(source.lookups(), 0);
}
