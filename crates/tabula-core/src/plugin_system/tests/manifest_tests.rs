use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use super::support::CountingSource;
use crate::plugin_system::dependency::{DependencyScope, DependencySpec, DependencyType};
use crate::plugin_system::lifecycle::PluginStatus;
use crate::plugin_system::manifest::{FormatCatalog, FormatManifest, ManifestPlugin};
use crate::plugin_system::resolver::DependencyResolver;
use crate::plugin_system::traits::{PluginError, TableFormatPlugin};

const CATALOG: &str = r#"
formats:
  - id: parquet
    name: Apache Parquet
    version: 1.2.0
    dependencies:
      - name: numpy
        version: ">=1.20.0"
      - name: pytest
        version: ">=7"
        scope: test
  - id: csv
    name: CSV
    version: "0.4"
    interfaces: [TableFormatPlugin, Streaming]
    dependencies:
      - name: chardet
        version: ">=4"
        type: optional
"#;

fn resolver() -> Arc<DependencyResolver> {
    Arc::new(DependencyResolver::with_source(Arc::new(
        CountingSource::new().with_package("numpy", "1.24.0"),
    )))
}

#[test]
fn test_catalog_from_yaml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("formats.yaml");
    fs::write(&path, CATALOG).unwrap();

    let catalog = FormatCatalog::from_path(&path).unwrap();
    assert_eq!(catalog.len(), 2);

    let parquet = &catalog.formats[0];
    assert_eq!(parquet.interfaces, vec!["TableFormatPlugin".to_string()]);
    assert_eq!(parquet.dependencies[0].dep_type, DependencyType::Required);
    assert_eq!(parquet.dependencies[1].scope, DependencyScope::Test);

    let csv = &catalog.formats[1];
    assert_eq!(csv.interfaces.len(), 2);
    assert_eq!(csv.dependencies[0].dep_type, DependencyType::Optional);
    assert_eq!(csv.to_metadata().dependencies["chardet"].version, ">=4");
}

#[test]
fn test_manifest_builder_and_problems() {
    let manifest = FormatManifest::new("orc", "ORC", "2.1.0")
        .description("Optimized row columnar")
        .interface("Streaming")
        .interface("Streaming")
        .dependency(DependencySpec::required("pyarrow", ">=10"));
    assert_eq!(manifest.interfaces, vec!["TableFormatPlugin".to_string(), "Streaming".to_string()]);
    assert!(manifest.problems().is_empty());

    let broken = FormatManifest::new("", "Broken", "next")
        .dependency(DependencySpec::required("pyarrow", "!=10"));
    assert_eq!(broken.problems().len(), 3);
}

#[tokio::test]
async fn test_manifest_plugin_validates_through_resolver() {
    let resolver = resolver();
    let ok = ManifestPlugin::new(
        FormatManifest::new("parquet", "Parquet", "1.0.0").dependency(DependencySpec::required("numpy", ">=1.20.0")),
        resolver.clone(),
    );
    assert!(ok.validate_dependencies().await.is_valid);

    let missing = ManifestPlugin::new(
        FormatManifest::new("delta", "Delta", "1.0.0").dependency(DependencySpec::required("deltalake", ">=0.10")),
        resolver.clone(),
    );
    assert!(!missing.validate_dependencies().await.is_valid);
    assert_eq!(resolver.cached_entries().await, 2);
}

#[tokio::test]
async fn test_manifest_plugin_tracks_status() {
    let plugin = ManifestPlugin::new(FormatManifest::new("csv", "CSV", "0.4"), resolver());
    assert_eq!(plugin.status(), PluginStatus::Registered);
    plugin.initialize().await.unwrap();
    assert_eq!(plugin.status(), PluginStatus::Active);
    plugin.shutdown().await.unwrap();
    assert_eq!(plugin.status(), PluginStatus::Registered);
}

#[tokio::test]
async fn test_manifest_plugin_with_bad_test_requirement_fails_to_initialize() {
    let manifest = FormatManifest::new("csv", "CSV", "0.4")
        .dependency(DependencySpec::required("pytest", "!=7").with_scope(DependencyScope::Test));
    let plugin = ManifestPlugin::new(manifest, resolver());

    assert!(plugin.validate_dependencies().await.is_valid);
    let err = plugin.initialize().await.unwrap_err();
    assert!(matches!(err, PluginError::InitError(_)));
    assert_eq!(plugin.status(), PluginStatus::Error);
}
