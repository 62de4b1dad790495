use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

use semver::{Comparator, Op, Version, VersionReq};

/// Error type for version and requirement parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),
    #[error("Version parse error: {0}")]
    ParseError(String),
    #[error("Unsupported version operator in '{0}'")]
    UnsupportedOperator(String),
}

/// Parses an installed package version.
///
/// Package indexes frequently report versions with fewer than three
/// components (`1.21`), or with a leading `v`. Those are padded with zeros;
/// anything else must be a valid semantic version.
pub fn parse_version(raw: &str) -> Result<Version, VersionError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(VersionError::InvalidFormat(raw.to_string()));
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u64>()
            .map_err(|e| VersionError::ParseError(format!("'{}': {}", raw, e)))?;
    }
    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Rewrites package-index requirement clauses into semver syntax.
///
/// `==X` becomes `=X`, `~=X.Y[.Z]` becomes the matching compatible-release
/// range and an empty requirement means any version. `!=` and `===` have no
/// semver counterpart and are rejected.
fn normalize_constraint(constraint: &str) -> Result<String, VersionError> {
    let trimmed = constraint.trim();
    if trimmed.is_empty() {
        return Ok("*".to_string());
    }

    let mut clauses = Vec::new();
    for clause in trimmed.split(',') {
        let clause = clause.trim();
        if clause.starts_with("===") || clause.starts_with("!=") {
            return Err(VersionError::UnsupportedOperator(constraint.to_string()));
        }
        if let Some(rest) = clause.strip_prefix("==") {
            clauses.push(format!("={}", rest.trim()));
        } else if let Some(rest) = clause.strip_prefix("~=") {
            clauses.push(compatible_release(rest.trim(), constraint)?);
        } else {
            clauses.push(clause.to_string());
        }
    }
    Ok(clauses.join(", "))
}

fn compatible_release(version: &str, constraint: &str) -> Result<String, VersionError> {
    let parts = version
        .split('.')
        .map(|p| p.parse::<u64>())
        .collect::<Result<Vec<u64>, _>>()
        .map_err(|e| VersionError::ParseError(format!("'{}': {}", constraint, e)))?;
    match parts.as_slice() {
        [major, minor] => Ok(format!(">={}.{}.0, <{}.0.0", major, minor, major.saturating_add(1))),
        [major, minor, patch] => Ok(format!(
            ">={}.{}.{}, <{}.{}.0",
            major,
            minor,
            patch,
            major,
            minor.saturating_add(1)
        )),
        _ => Err(VersionError::InvalidFormat(constraint.to_string())),
    }
}

/// A contiguous span of versions between two bounds.
///
/// Every semver comparator describes one such span, so the conjunction of a
/// requirement's comparators (and of several requirements) is again a single
/// span obtained by intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInterval {
    lower: Bound<Version>,
    upper: Bound<Version>,
}

impl VersionInterval {
    /// The interval containing every version
    pub fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn lower(&self) -> &Bound<Version> {
        &self.lower
    }

    pub fn upper(&self) -> &Bound<Version> {
        &self.upper
    }

    /// Converts one comparator into the span of versions it accepts.
    pub fn from_comparator(comparator: &Comparator) -> Result<Self, VersionError> {
        let major = comparator.major;
        let floor = Version {
            major,
            minor: comparator.minor.unwrap_or(0),
            patch: comparator.patch.unwrap_or(0),
            pre: comparator.pre.clone(),
            build: semver::BuildMetadata::EMPTY,
        };
        // First version past a partially specified one: `1` -> 2.0.0, `1.2` -> 1.3.0
        let past_partial = match (comparator.minor, comparator.patch) {
            (None, _) => Version::new(major.saturating_add(1), 0, 0),
            (Some(minor), None) => Version::new(major, minor.saturating_add(1), 0),
            (Some(minor), Some(patch)) => Version::new(major, minor, patch.saturating_add(1)),
        };
        let fully_specified = comparator.patch.is_some();

        let (lower, upper) = match comparator.op {
            Op::Exact | Op::Wildcard if fully_specified => {
                (Bound::Included(floor.clone()), Bound::Included(floor))
            }
            Op::Exact | Op::Wildcard => (Bound::Included(floor), Bound::Excluded(past_partial)),
            Op::Greater if fully_specified => (Bound::Excluded(floor), Bound::Unbounded),
            Op::Greater => (Bound::Included(past_partial), Bound::Unbounded),
            Op::GreaterEq => (Bound::Included(floor), Bound::Unbounded),
            Op::Less => (Bound::Unbounded, Bound::Excluded(floor)),
            Op::LessEq if fully_specified => (Bound::Unbounded, Bound::Included(floor)),
            Op::LessEq => (Bound::Unbounded, Bound::Excluded(past_partial)),
            Op::Tilde => {
                let ceiling = match comparator.minor {
                    None => Version::new(major.saturating_add(1), 0, 0),
                    Some(minor) => Version::new(major, minor.saturating_add(1), 0),
                };
                (Bound::Included(floor), Bound::Excluded(ceiling))
            }
            Op::Caret => {
                let ceiling = match (major, comparator.minor, comparator.patch) {
                    (0, None, _) => Version::new(1, 0, 0),
                    (0, Some(0), None) => Version::new(0, 1, 0),
                    (0, Some(0), Some(patch)) => Version::new(0, 0, patch.saturating_add(1)),
                    (0, Some(minor), _) => Version::new(0, minor.saturating_add(1), 0),
                    (major, _, _) => Version::new(major.saturating_add(1), 0, 0),
                };
                (Bound::Included(floor), Bound::Excluded(ceiling))
            }
            _ => return Err(VersionError::UnsupportedOperator(comparator.to_string())),
        };
        Ok(Self { lower, upper })
    }

    /// Narrows this interval to the versions also accepted by `other`.
    pub fn intersect(&self, other: &VersionInterval) -> VersionInterval {
        VersionInterval {
            lower: tighter_lower(&self.lower, &other.lower),
            upper: tighter_upper(&self.upper, &other.upper),
        }
    }

    /// The smallest release version inside the interval, if there is one.
    ///
    /// Pre-release versions are never offered as witnesses: a span that only
    /// contains pre-releases counts as empty.
    pub fn witness(&self) -> Option<Version> {
        let candidate = match &self.lower {
            Bound::Unbounded => Version::new(0, 0, 0),
            Bound::Excluded(v) if v.pre.is_empty() => {
                Version::new(v.major, v.minor, v.patch.saturating_add(1))
            }
            Bound::Included(v) | Bound::Excluded(v) => Version::new(v.major, v.minor, v.patch),
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(upper) => candidate <= *upper,
            Bound::Excluded(upper) => candidate < *upper,
        };
        below_upper.then_some(candidate)
    }

    pub fn is_empty(&self) -> bool {
        self.witness().is_none()
    }
}

fn tighter_lower(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other.clone(),
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.max(y).clone()),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.max(y).clone()),
        (Bound::Included(inc), Bound::Excluded(exc)) | (Bound::Excluded(exc), Bound::Included(inc)) => {
            if exc >= inc {
                Bound::Excluded(exc.clone())
            } else {
                Bound::Included(inc.clone())
            }
        }
    }
}

fn tighter_upper(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other.clone(),
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.min(y).clone()),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.min(y).clone()),
        (Bound::Included(inc), Bound::Excluded(exc)) | (Bound::Excluded(exc), Bound::Included(inc)) => {
            if exc <= inc {
                Bound::Excluded(exc.clone())
            } else {
                Bound::Included(inc.clone())
            }
        }
    }
}

/// Represents a version requirement range using semver constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    /// The original constraint string (e.g., ">=1.20.0", "^1.2")
    constraint: String,
    /// The parsed semver requirement
    req: VersionReq,
}

impl VersionRange {
    /// Creates a new version range from a constraint string.
    pub fn from_constraint(constraint: &str) -> Result<Self, VersionError> {
        let normalized = normalize_constraint(constraint)?;
        let req = VersionReq::parse(&normalized).map_err(|e| {
            VersionError::ParseError(format!("Invalid version constraint '{}': {}", constraint, e))
        })?;
        Ok(Self {
            constraint: constraint.trim().to_string(),
            req,
        })
    }

    /// A range accepting every version
    pub fn any() -> Self {
        Self {
            constraint: "*".to_string(),
            req: VersionReq::STAR,
        }
    }

    /// Checks if a specific version satisfies this range.
    pub fn includes(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// Returns the original constraint string.
    pub fn constraint_string(&self) -> &str {
        &self.constraint
    }

    /// The span of versions accepted by every comparator of this range.
    pub fn interval(&self) -> Result<VersionInterval, VersionError> {
        self.req
            .comparators
            .iter()
            .try_fold(VersionInterval::unbounded(), |acc, comparator| {
                Ok(acc.intersect(&VersionInterval::from_comparator(comparator)?))
            })
    }

    /// Intersects two ranges. `Ok(None)` means no release satisfies both.
    pub fn intersect(&self, other: &VersionRange) -> Result<Option<VersionRange>, VersionError> {
        merge_ranges([self, other])
    }
}

/// Merges several requirements into one that accepts exactly the versions
/// accepted by all of them.
///
/// Returns `Ok(None)` when the requirements cannot be satisfied together and
/// an error when one of them uses an operator that has no interval form.
/// Identical requirements merge into themselves.
pub fn merge_ranges<'a, I>(ranges: I) -> Result<Option<VersionRange>, VersionError>
where
    I: IntoIterator<Item = &'a VersionRange>,
{
    let ranges: Vec<&VersionRange> = ranges.into_iter().collect();
    let Some(first) = ranges.first().copied() else {
        return Ok(Some(VersionRange::any()));
    };

    let mut interval = VersionInterval::unbounded();
    let mut comparators: Vec<Comparator> = Vec::new();
    for range in &ranges {
        interval = interval.intersect(&range.interval()?);
        for comparator in &range.req.comparators {
            if !comparators.contains(comparator) {
                comparators.push(comparator.clone());
            }
        }
    }

    let Some(witness) = interval.witness() else {
        return Ok(None);
    };
    if !ranges.iter().all(|range| range.includes(&witness)) {
        return Ok(None);
    }

    if ranges.iter().all(|range| range.req == first.req) {
        return Ok(Some(first.clone()));
    }
    let req = VersionReq { comparators };
    Ok(Some(VersionRange {
        constraint: req.to_string(),
        req,
    }))
}

/// Implement Display to show the original constraint string.
impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constraint)
    }
}

/// Allow parsing directly from a string slice.
impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::from_constraint(s)
    }
}
