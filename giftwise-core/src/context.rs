//! Execution context handed to hooks
//!
//! Every hook call receives an owned copy of the command arguments and the
//! host config. Hooks never see the caller's live map, only the value that was
//! copied into the context when the call was prepared.

use serde::Serialize;
use serde_json::{Map, Value};

/// Data passed into a hook invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionContext {
    /// Command-line arguments of the host invocation
    pub args: Vec<String>,
    /// Host configuration as seen by this hook
    pub config: Map<String, Value>,
    /// Logical command name, e.g. `calc`
    pub command: Option<String>,
    /// Rendered command output (after phase only)
    pub output: Option<String>,
    /// Structured command result (after phase only)
    pub result: Option<Value>,
}

impl ExecutionContext {
    /// Context for the before phase
    pub fn before(args: &[String], config: &Map<String, Value>, command: Option<&str>) -> Self {
        Self {
            args: args.to_vec(),
            config: config.clone(),
            command: command.map(str::to_string),
            output: None,
            result: None,
        }
    }

    /// Context for the after phase
    pub fn after(
        args: &[String],
        config: &Map<String, Value>,
        output: &str,
        result: &Value,
        command: Option<&str>,
    ) -> Self {
        Self {
            args: args.to_vec(),
            config: config.clone(),
            command: command.map(str::to_string),
            output: Some(output.to_string()),
            result: Some(result.clone()),
        }
    }

    /// After-phase contexts are the ones carrying a command output or result
    pub fn is_after_phase(&self) -> bool {
        self.output.is_some() || self.result.is_some()
    }

    /// Same context with the config replaced
    pub fn with_config(&self, config: Map<String, Value>) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    /// Positional hook arguments.
    ///
    /// Before phase: `(args, config, command)`.
    /// After phase: `(args, config, output, result, command)`.
    /// Absent values are passed as `null`.
    pub fn positional_args(&self) -> Vec<Value> {
        let args = Value::Array(self.args.iter().cloned().map(Value::String).collect());
        let config = Value::Object(self.config.clone());
        let command = self.command.clone().map(Value::String).unwrap_or(Value::Null);

        if self.is_after_phase() {
            let output = self.output.clone().map(Value::String).unwrap_or(Value::Null);
            let result = self.result.clone().unwrap_or(Value::Null);
            vec![args, config, output, result, command]
        } else {
            vec![args, config, command]
        }
    }
}

/// Shallow merge: top-level keys of `delta` replace those in `target`
pub fn merge_shallow(target: &mut Map<String, Value>, delta: &Map<String, Value>) {
    for (key, value) in delta {
        target.insert(key.clone(), value.clone());
    }
}
