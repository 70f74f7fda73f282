//! Hook error taxonomy

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::config::Phase;

/// Errors produced while loading or running hooks.
///
/// Loader and engine return these as data; only the pipeline decides whether
/// one of them ends the host process.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookError {
    /// Malformed pipeline settings, always recovered locally
    #[error("invalid hooks configuration: {message}")]
    ConfigValidation { message: String },

    /// Script path is relative, missing, not a file or has the wrong extension
    #[error("invalid hook path '{path}': {message}")]
    PathValidation { path: String, message: String },

    /// The script could not be read or evaluated
    #[error("failed to load hook '{name}': {message}")]
    ModuleLoad { name: String, message: String },

    /// No callable export, or the callable has the wrong arity
    #[error("hook '{name}' has an invalid signature: {message}")]
    Signature { name: String, message: String },

    /// The hook did not finish within its budget
    #[error("hook '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    /// The hook raised an error or returned something unusable
    #[error("hook '{name}' failed: {message}")]
    PluginRuntime { name: String, message: String },
}

impl HookError {
    pub fn path_validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PathValidation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn module_load(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleLoad {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn signature(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Signature {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn runtime(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PluginRuntime {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigValidation { .. } => "config_validation",
            Self::PathValidation { .. } => "path_validation",
            Self::ModuleLoad { .. } => "module_load",
            Self::Signature { .. } => "signature",
            Self::Timeout { .. } => "timeout",
            Self::PluginRuntime { .. } => "plugin_runtime",
        }
    }

    /// Name (or path) of the hook the error belongs to
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::ConfigValidation { .. } => None,
            Self::PathValidation { path, .. } => Some(path),
            Self::ModuleLoad { name, .. }
            | Self::Signature { name, .. }
            | Self::Timeout { name, .. }
            | Self::PluginRuntime { name, .. } => Some(name),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A hook phase failed while `failOnError` was set.
///
/// The host reacts by ending the process with status 1; see [`HookAbort::exit`].
#[derive(Debug, Clone)]
pub struct HookAbort {
    pub phase: Phase,
    pub errors: Vec<HookError>,
}

impl HookAbort {
    pub fn new(phase: Phase, errors: Vec<HookError>) -> Self {
        Self { phase, errors }
    }

    /// Writes the diagnostic to stderr and terminates with exit code 1
    pub fn exit(&self) -> ! {
        eprintln!("Error: {self}");
        std::process::exit(1)
    }
}

impl fmt::Display for HookAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hooks aborted the command", self.phase)?;
        match self.errors.first() {
            Some(first) => write!(f, ": {first}")?,
            None => f.write_str(": unknown failure")?,
        }
        if self.errors.len() > 1 {
            write!(f, " (and {} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for HookAbort {}
