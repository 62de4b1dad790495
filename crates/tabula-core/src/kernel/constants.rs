/// Capability name every table format plugin implements
pub const TABLE_FORMAT_INTERFACE: &str = "TableFormatPlugin";

/// Component name used in reports produced by cross-plugin resolution
pub const RESOLVER_COMPONENT: &str = "dependency_resolver";

/// Default lifetime of a cached dependency validation, in seconds
pub const DEFAULT_CACHE_TTL_SECS: f64 = 3600.0;

/// Default maximum depth for transitive dependency resolution
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default package index
pub const DEFAULT_PACKAGE_INDEX: &str = "https://pypi.org/simple";

/// Default timeout for a single installed-version lookup, in seconds
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: f64 = 5.0;
