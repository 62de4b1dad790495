//! Plugin status lifecycle.
//!
//! ```text
//! Registered --> Initializing --> Active
//!                     |             |
//!                     v             | shutdown
//!                   Error           v
//!                               Registered
//! ```
//!
//! [`LifecycleTracker`] owns the metadata of every registered plugin together
//! with the ordered list of active formats, and is the only place where a
//! plugin's status changes. The list of active formats is updated in the same
//! step as the status, so it always holds exactly the plugins whose status is
//! [`PluginStatus::Active`].
use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::metadata::PluginMetadata;

/// Status of a plugin in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginStatus {
    Registered,
    Initializing,
    Active,
    /// Initialization failed. Terminal.
    Error,
}

impl PluginStatus {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: PluginStatus) -> bool {
        matches!(
            (self, next),
            (PluginStatus::Registered, PluginStatus::Initializing)
                | (PluginStatus::Initializing, PluginStatus::Active)
                | (PluginStatus::Initializing, PluginStatus::Error)
                | (PluginStatus::Active, PluginStatus::Registered)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == PluginStatus::Error
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginStatus::Registered => write!(f, "REGISTERED"),
            PluginStatus::Initializing => write!(f, "INITIALIZING"),
            PluginStatus::Active => write!(f, "ACTIVE"),
            PluginStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Metadata table plus active-format list, mutated only through transitions
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    metadata: HashMap<String, PluginMetadata>,
    /// Active plugin ids in activation order
    active_formats: Vec<String>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a newly registered plugin. Its status is reset to
    /// `Registered`.
    pub fn admit(&mut self, mut metadata: PluginMetadata) -> Result<(), PluginSystemError> {
        let id = metadata.id().to_string();
        if self.metadata.contains_key(&id) {
            return Err(PluginSystemError::AlreadyRegistered { plugin_id: id });
        }
        metadata.set_status(PluginStatus::Registered);
        self.metadata.insert(id, metadata);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.metadata.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PluginMetadata> {
        self.metadata.get(id)
    }

    pub fn status(&self, id: &str) -> Option<PluginStatus> {
        self.metadata.get(id).map(PluginMetadata::status)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Owned copy of the metadata table
    pub fn metadata_snapshot(&self) -> HashMap<String, PluginMetadata> {
        self.metadata.clone()
    }

    pub fn active_formats(&self) -> &[String] {
        &self.active_formats
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.status(id) == Some(PluginStatus::Active)
    }

    /// Registered -> Initializing
    pub fn begin_initialize(&mut self, id: &str) -> Result<(), PluginSystemError> {
        self.transition(id, PluginStatus::Initializing)
    }

    /// Registered -> Initializing, returning a guard that settles the
    /// transition. Dropping the guard unsettled moves the plugin to `Error`.
    pub fn start_initialize(&mut self, id: &str) -> Result<PendingInitialize<'_>, PluginSystemError> {
        self.begin_initialize(id)?;
        Ok(PendingInitialize {
            tracker: self,
            id: id.to_string(),
            settled: false,
        })
    }

    /// Initializing -> Active
    pub fn complete_initialize(&mut self, id: &str) -> Result<(), PluginSystemError> {
        self.transition(id, PluginStatus::Active)
    }

    /// Initializing -> Error
    pub fn fail_initialize(&mut self, id: &str) -> Result<(), PluginSystemError> {
        self.transition(id, PluginStatus::Error)
    }

    /// Active -> Registered
    pub fn complete_shutdown(&mut self, id: &str) -> Result<(), PluginSystemError> {
        self.transition(id, PluginStatus::Registered)
    }

    fn transition(&mut self, id: &str, next: PluginStatus) -> Result<(), PluginSystemError> {
        let metadata = self
            .metadata
            .get_mut(id)
            .ok_or_else(|| PluginSystemError::not_found(id))?;
        let current = metadata.status();
        if !current.can_transition_to(next) {
            return Err(PluginSystemError::InvalidTransition {
                plugin_id: id.to_string(),
                from: current,
                to: next,
            });
        }

        metadata.set_status(next);
        if next == PluginStatus::Active {
            if !self.active_formats.iter().any(|active| active == id) {
                self.active_formats.push(id.to_string());
            }
        } else {
            self.active_formats.retain(|active| active != id);
        }
        debug!("Plugin {} transitioned {} -> {}", id, current, next);
        Ok(())
    }
}

/// An initialization in flight, see [`LifecycleTracker::start_initialize`]
#[derive(Debug)]
pub struct PendingInitialize<'a> {
    tracker: &'a mut LifecycleTracker,
    id: String,
    settled: bool,
}

impl PendingInitialize<'_> {
    /// Initializing -> Active
    pub fn complete(mut self) -> Result<(), PluginSystemError> {
        self.settled = true;
        self.tracker.complete_initialize(&self.id)
    }

    /// Initializing -> Error
    pub fn fail(mut self) -> Result<(), PluginSystemError> {
        self.settled = true;
        self.tracker.fail_initialize(&self.id)
    }
}

impl Drop for PendingInitialize<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("Initialization of plugin {} was abandoned", self.id);
        if let Err(e) = self.tracker.fail_initialize(&self.id) {
            warn!("Could not mark plugin {} as failed: {}", self.id, e);
        }
    }
}
