use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use semver::Version;

use crate::plugin_system::dependency::DependencySpec;
use crate::plugin_system::introspection::{VersionLookupError, VersionSource};
use crate::plugin_system::lifecycle::PluginStatus;
use crate::plugin_system::resolver::DependencyResolver;
use crate::plugin_system::traits::{PluginError, TableFormatPlugin};
use crate::plugin_system::validation::ValidationResult;

/// Version source backed by a map, counting every lookup
#[derive(Default)]
pub struct CountingSource {
    packages: HashMap<String, Result<Option<Version>, VersionLookupError>>,
    lookups: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        let version = Version::parse(version).expect("test version must parse");
        self.packages.insert(name.to_string(), Ok(Some(version)));
        self
    }

    pub fn with_failure(mut self, name: &str, message: &str) -> Self {
        self.packages.insert(
            name.to_string(),
            Err(VersionLookupError::Unavailable {
                package: name.to_string(),
                message: message.to_string(),
            }),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionSource for CountingSource {
    async fn installed_version(&self, package: &str) -> Result<Option<Version>, VersionLookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.packages.get(package).cloned().unwrap_or(Ok(None))
    }
}

/// Configurable in-memory plugin
pub struct MockFormat {
    pub id: String,
    pub version: String,
    pub deps: Vec<DependencySpec>,
    pub fail_init: bool,
    pub fail_shutdown: bool,
    pub init_delay: Option<Duration>,
    pub validation: Option<ValidationResult>,
    pub resolver: Option<Arc<DependencyResolver>>,
    pub init_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
    pub events: Option<Arc<StdMutex<Vec<String>>>>,
}

impl MockFormat {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            deps: Vec::new(),
            fail_init: false,
            fail_shutdown: false,
            init_delay: None,
            validation: None,
            resolver: None,
            init_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            events: None,
        }
    }

    pub fn with_dependency(mut self, dep: DependencySpec) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    pub fn slow_init(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn with_validation(mut self, validation: ValidationResult) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_events(mut self, events: Arc<StdMutex<Vec<String>>>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    fn record(&self, event: &str) {
        if let Some(events) = &self.events {
            events.lock().unwrap().push(format!("{}:{}", event, self.id));
        }
    }
}

#[async_trait]
impl TableFormatPlugin for MockFormat {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Format"
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn initialize(&self) -> Result<(), PluginError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.record("init");
        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_init {
            return Err(PluginError::InitError("boom".to_string()));
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        self.record("shutdown");
        if self.fail_shutdown {
            return Err(PluginError::ShutdownError("stuck".to_string()));
        }
        Ok(())
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        self.deps.clone()
    }

    async fn validate_dependencies(&self) -> ValidationResult {
        if let Some(resolver) = &self.resolver {
            let metadata = crate::plugin_system::metadata::PluginMetadata::new(self.identity())
                .with_dependencies(self.deps.clone());
            return resolver.validate_dependencies(&metadata).await;
        }
        self.validation.clone().unwrap_or_default()
    }

    fn status(&self) -> PluginStatus {
        PluginStatus::Registered
    }
}
