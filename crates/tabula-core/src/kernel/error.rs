//! # Tabula Core Kernel Errors
//!
//! Defines the top-level error type of the crate.
//!
//! [`Error`] wraps the typed errors of each subsystem so that callers
//! driving several of them (the CLI, for instance) can use a single
//! `Result` alias.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::plugin_system::config::ConfigError;
use crate::plugin_system::error::PluginSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
