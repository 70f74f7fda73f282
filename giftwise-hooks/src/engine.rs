//! Hook execution
//!
//! Hooks run one at a time, in list order. Each call gets its own worker
//! thread and a wall-clock budget; the config returned by a before-phase hook
//! is folded into the config the next hook sees.

use chrono::Utc;
use giftwise_core::config::{DEFAULT_TIMEOUT_MS, json_type_name};
use giftwise_core::context::{ExecutionContext, merge_shallow};
use giftwise_core::error::HookError;
use giftwise_core::outcome::{HookReturn, PipelineOutcome, PluginOutcome};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::hook::HookWrapper;

/// Options for a single hook call
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub timeout_ms: u64,
}

impl RunOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Options for a phase run
#[derive(Debug, Clone, Copy)]
pub struct RunManyOptions {
    pub timeout_ms: u64,
    /// Stop at the first failing hook
    pub fail_on_error: bool,
    /// Log each hook's result at info level instead of debug
    pub verbose: bool,
}

impl Default for RunManyOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            fail_on_error: false,
            verbose: false,
        }
    }
}

/// Runs one hook against `context`.
///
/// The call runs on a detached thread and the engine waits at most
/// `timeout_ms` for it. On timeout the wait is abandoned, not the call: the
/// hook keeps running until it returns on its own, and whatever it returns
/// then is dropped. Side effects of an abandoned hook can still happen after
/// the outcome was produced.
pub async fn run_one(hook: &HookWrapper, context: &ExecutionContext, options: &RunOptions) -> PluginOutcome {
    let name = hook.name().to_string();
    let args = context.positional_args();
    let after_phase = context.is_after_phase();

    let started = Instant::now();
    let (tx, rx) = oneshot::channel();
    let worker = hook.clone();

    let spawned = std::thread::Builder::new()
        .name(format!("hook:{name}"))
        .spawn(move || {
            // The receiver is gone when the engine stopped waiting
            let _ = tx.send(worker.call(args));
        });

    if let Err(e) = spawned {
        let error = HookError::runtime(&name, format!("cannot start hook worker: {e}"));
        return PluginOutcome::failure(&name, error, elapsed_ms(started));
    }

    let settled = tokio::time::timeout(options.timeout(), rx).await;
    let elapsed = elapsed_ms(started);

    match settled {
        Err(_) => {
            debug!("Hook {} timed out after {}ms", name, options.timeout_ms);
            let error = HookError::Timeout {
                name: name.clone(),
                timeout_ms: options.timeout_ms,
            };
            PluginOutcome::failure(&name, error, elapsed)
        }
        Ok(Err(_)) => {
            let error = HookError::runtime(&name, "hook worker stopped without a result");
            PluginOutcome::failure(&name, error, elapsed)
        }
        Ok(Ok(Err(error))) => PluginOutcome::failure(&name, error, elapsed),
        Ok(Ok(Ok(returned))) => match normalize(&name, returned, after_phase) {
            Ok(delta) => PluginOutcome::success(&name, delta, elapsed),
            Err(error) => PluginOutcome::failure(&name, error, elapsed),
        },
    }
}

/// Runs `hooks` in order, folding before-phase config deltas.
///
/// Each hook sees the initial config shallow-merged with every successful
/// delta before it. Failures are recorded; with `fail_on_error` the run stops
/// at the first one.
pub async fn run_many(
    hooks: &[HookWrapper],
    context: &ExecutionContext,
    options: &RunManyOptions,
) -> PipelineOutcome {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let started = Instant::now();

    let run_options = RunOptions {
        timeout_ms: options.timeout_ms,
    };

    let mut config = context.config.clone();
    let mut outcomes = Vec::with_capacity(hooks.len());
    let mut errors = Vec::new();

    for hook in hooks {
        let call_context = context.with_config(config.clone());
        let outcome = run_one(hook, &call_context, &run_options).await;

        if let Some(error) = &outcome.error {
            if options.verbose {
                info!("Hook {} failed after {}ms: {}", outcome.name, outcome.elapsed_ms, error);
            } else {
                debug!("Hook {} failed after {}ms: {}", outcome.name, outcome.elapsed_ms, error);
            }
            errors.push(error.clone());
            outcomes.push(outcome);
            if options.fail_on_error {
                break;
            }
            continue;
        }

        if let Some(delta) = &outcome.config_delta {
            merge_shallow(&mut config, delta);
        }
        if options.verbose {
            info!("Hook {} finished in {}ms", outcome.name, outcome.elapsed_ms);
        } else {
            debug!("Hook {} finished in {}ms", outcome.name, outcome.elapsed_ms);
        }
        outcomes.push(outcome);
    }

    PipelineOutcome {
        run_id,
        started_at,
        all_succeeded: errors.is_empty(),
        outcomes,
        final_config: config,
        errors,
        total_elapsed_ms: elapsed_ms(started),
    }
}

/// Turns a raw hook return into a config delta or an error
fn normalize(name: &str, returned: HookReturn, after_phase: bool) -> Result<Option<Map<String, Value>>, HookError> {
    let mut table = match returned {
        HookReturn::Empty => return Ok(None),
        HookReturn::Error(message) => return Err(HookError::runtime(name, message)),
        HookReturn::Unexpected(kind) => {
            return Err(HookError::runtime(
                name,
                format!("hook returned a {kind}, expected a table or nil"),
            ));
        }
        HookReturn::Table(table) => table,
    };

    if let Some(error) = table.remove("error").filter(|e| !e.is_null()) {
        return Err(HookError::runtime(name, error_text(&error)));
    }

    let delta = match table.remove("config") {
        None | Some(Value::Null) => None,
        Some(Value::Object(delta)) => Some(delta),
        Some(other) => {
            return Err(HookError::runtime(
                name,
                format!("`config` must be a table, got {}", json_type_name(&other)),
            ));
        }
    };

    // After-phase hooks observe only
    Ok(if after_phase { None } else { delta })
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
