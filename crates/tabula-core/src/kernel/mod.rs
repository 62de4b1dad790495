//! # Tabula Core Kernel
//!
//! Crate-wide building blocks shared by every subsystem:
//!
//! - **Constants**: default configuration values and well-known names, in the
//!   `constants` submodule.
//! - **Error Handling**: the top-level [`Error`](error::Error) enum and the
//!   `Result` alias in the `error` submodule. Subsystem errors such as
//!   [`PluginSystemError`](crate::plugin_system::error::PluginSystemError)
//!   convert into it with `?`.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
