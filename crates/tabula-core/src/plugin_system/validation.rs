//! Structured results returned by validation, resolution and admission.
//!
//! Every check in the plugin system reports through a [`ValidationResult`]
//! instead of failing: errors and warnings are accumulated as messages, and
//! dependency problems additionally keep their structured [`ErrorReport`].
use std::fmt;
use std::time::SystemTime;

use serde::Serialize;
use serde_json::{Map, Value};

/// Stable identifiers for dependency problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// A required dependency is not installed
    #[serde(rename = "DEP001")]
    MissingDependency,
    /// The installed version does not satisfy the requirement
    #[serde(rename = "DEP002")]
    VersionMismatch,
    /// The requirement or the installed-version lookup failed
    #[serde(rename = "DEP003")]
    ValidationFailure,
    /// Requirements from several plugins cannot be satisfied together
    #[serde(rename = "DEP004")]
    IncompatibleRequirements,
    /// Requirements from several plugins could not be merged
    #[serde(rename = "DEP005")]
    ResolutionFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingDependency => "DEP001",
            ErrorCode::VersionMismatch => "DEP002",
            ErrorCode::ValidationFailure => "DEP003",
            ErrorCode::IncompatibleRequirements => "DEP004",
            ErrorCode::ResolutionFailure => "DEP005",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// A structured description of one dependency problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub severity: Severity,
    /// Affected plugin id or system component
    pub component: String,
    /// Human-readable description
    pub message: String,
    /// Operation, dependency and versions involved
    pub context: Map<String, Value>,
    /// Suggested resolution steps
    pub resolution: Vec<String>,
    pub timestamp: SystemTime,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, component: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            component: component.to_string(),
            message: message.into(),
            context: Map::new(),
            resolution: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn with_resolution(mut self, step: impl Into<String>) -> Self {
        self.resolution.push(step.into());
        self
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {} (context: {})",
            self.code,
            self.severity,
            self.component,
            self.message,
            Value::Object(self.context.clone())
        )?;
        if !self.resolution.is_empty() {
            write!(f, " resolution: {}", self.resolution.join("; "))?;
        }
        Ok(())
    }
}

/// Result of a validation operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Whether validation passed
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Structured form of the errors that came from dependency checks
    pub reports: Vec<ErrorReport>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Builds a result from accumulated reports; valid when there are none.
    pub fn from_reports(reports: Vec<ErrorReport>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: reports.is_empty(),
            errors: reports.iter().map(ToString::to_string).collect(),
            warnings,
            reports,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}
