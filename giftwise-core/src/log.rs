//! Log types shared with the Lua `log` module

use serde::{Deserialize, Serialize};

/// Severity of a message written by a hook through `log.*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
