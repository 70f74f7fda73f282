//! Hook and phase outcomes
//!
//! These types only describe what happened during a phase run. They are
//! serializable so the CLI can print them as a JSON report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::HookError;

/// Raw value returned by a hook, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum HookReturn {
    /// `nil` or no return value
    Empty,
    /// A table with string keys, e.g. `{ config = {...}, error = "..." }`
    Table(Map<String, Value>),
    /// An error value returned instead of raised
    Error(String),
    /// Anything else, described by its type
    Unexpected(String),
}

/// Result of one hook call
#[derive(Debug, Clone, Serialize)]
pub struct PluginOutcome {
    pub name: String,
    pub succeeded: bool,
    /// Config changes requested by a before-phase hook
    pub config_delta: Option<Map<String, Value>>,
    pub error: Option<HookError>,
    pub elapsed_ms: u64,
}

impl PluginOutcome {
    pub fn success(
        name: impl Into<String>,
        config_delta: Option<Map<String, Value>>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            succeeded: true,
            config_delta,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(name: impl Into<String>, error: HookError, elapsed_ms: u64) -> Self {
        Self {
            name: name.into(),
            succeeded: false,
            config_delta: None,
            error: Some(error),
            elapsed_ms,
        }
    }
}

/// Aggregate result of one phase run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// True only when no error was recorded
    pub all_succeeded: bool,
    /// One entry per hook that ran, in execution order
    pub outcomes: Vec<PluginOutcome>,
    /// Initial config folded with every successful delta
    pub final_config: Map<String, Value>,
    pub errors: Vec<HookError>,
    pub total_elapsed_ms: u64,
}

impl PipelineOutcome {
    /// One-line summary for verbose output
    pub fn summary(&self) -> String {
        let failed = self.outcomes.iter().filter(|o| !o.succeeded).count();
        format!(
            "{} hook(s) ran, {} succeeded, {} failed in {}ms",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed,
            self.total_elapsed_ms
        )
    }
}
