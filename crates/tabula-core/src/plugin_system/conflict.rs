//! Pairwise dependency conflicts between a candidate plugin and the plugins
//! already registered.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::plugin_system::dependency::DependencySpec;
use crate::plugin_system::metadata::CompatibilityResult;
use crate::plugin_system::traits::TableFormatPlugin;
use crate::plugin_system::version::VersionRange;

/// Types of plugin conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// Two plugins require versions of the same dependency that cannot
    /// be satisfied together
    DependencyVersion,
    /// One of the two requirements could not be parsed
    InvalidRequirement,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::DependencyVersion => "dependency_version",
            ConflictType::InvalidRequirement => "invalid_requirement",
        }
    }

    /// Get a human-readable description of this conflict type
    pub fn description(&self) -> &'static str {
        match self {
            ConflictType::DependencyVersion => "Conflicting dependency versions",
            ConflictType::InvalidRequirement => "Unparseable dependency requirement",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency conflict between the candidate and one registered plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConflict {
    /// The registered plugin the candidate conflicts with
    pub plugin: String,
    pub dependency: String,
    /// The candidate's requirement
    pub required: String,
    /// The registered plugin's requirement
    pub conflicting_requirement: String,
    pub conflict_type: ConflictType,
}

impl PluginConflict {
    /// Flatten into the record form carried by [`CompatibilityResult`]
    pub fn to_record(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("plugin".to_string(), self.plugin.clone()),
            ("dependency".to_string(), self.dependency.clone()),
            ("required".to_string(), self.required.clone()),
            (
                "conflicting_requirement".to_string(),
                self.conflicting_requirement.clone(),
            ),
            ("conflict_type".to_string(), self.conflict_type.to_string()),
        ])
    }
}

impl fmt::Display for PluginConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} requires {} but {} requires {}",
            self.conflict_type.description(),
            self.dependency,
            self.required,
            self.plugin,
            self.conflicting_requirement
        )
    }
}

/// Conflict between two requirements of the same dependency, if any
pub fn compare_requirements(
    other_plugin: &str,
    ours: &DependencySpec,
    theirs: &DependencySpec,
) -> Option<PluginConflict> {
    if ours.version.trim() == theirs.version.trim() {
        return None;
    }
    let conflict_type = match (ours.range(), theirs.range()) {
        (Ok(a), Ok(b)) => match a.intersect(&b) {
            Ok(Some(_)) => return None,
            Ok(None) => ConflictType::DependencyVersion,
            Err(_) => ConflictType::InvalidRequirement,
        },
        _ => ConflictType::InvalidRequirement,
    };
    Some(PluginConflict {
        plugin: other_plugin.to_string(),
        dependency: ours.name.clone(),
        required: ours.version.clone(),
        conflicting_requirement: theirs.version.clone(),
        conflict_type,
    })
}

/// Compare a candidate's runtime dependencies against every other plugin's
/// runtime dependencies of the same name.
///
/// Plugins sharing the candidate's id are skipped.
pub fn check_dependency_compatibility(
    candidate_id: &str,
    dependencies: &[DependencySpec],
    others: &[Arc<dyn TableFormatPlugin>],
) -> CompatibilityResult {
    let ours: Vec<&DependencySpec> = dependencies.iter().filter(|d| d.is_runtime()).collect();
    if ours.is_empty() {
        return CompatibilityResult::compatible();
    }

    let mut conflicts = Vec::new();
    for other in others.iter().filter(|other| other.id() != candidate_id) {
        for theirs in other.dependencies().iter().filter(|d| d.is_runtime()) {
            for dep in ours.iter().filter(|d| d.name == theirs.name) {
                if let Some(conflict) = compare_requirements(other.id(), dep, theirs) {
                    debug!("{} conflicts with {}: {}", candidate_id, other.id(), conflict);
                    conflicts.push(conflict.to_record());
                }
            }
        }
    }
    CompatibilityResult::from_conflicts(conflicts)
}

/// Parse check used by callers that want to pre-validate a requirement
pub fn is_valid_requirement(requirement: &str) -> bool {
    VersionRange::from_constraint(requirement).is_ok()
}
