//! Hook pipeline orchestration
//!
//! [`HookPipeline`] is what a host calls around its commands. It reads the
//! `hooks` section of the host config, loads the scripts of the requested
//! phase and runs them. It is also the only place that decides whether a hook
//! failure ends the host command ([`HookAbort`]), based on `failOnError`.

use async_trait::async_trait;
use giftwise_core::config::{Phase, PipelineConfig};
use giftwise_core::context::ExecutionContext;
use giftwise_core::error::{HookAbort, HookError};
use giftwise_core::outcome::PipelineOutcome;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::engine::{RunManyOptions, run_many};
use crate::loader::{LoadOptions, ScriptLoader, resolve_script_paths};
use crate::module::HostModuleRegistry;

/// What a host command produced, handed to after-phase hooks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutput {
    /// Rendered, human-readable output
    pub output: String,
    /// Structured result
    pub result: Value,
}

/// A host command that can be wrapped by the pipeline
#[async_trait]
pub trait HostCommand: Send + Sync {
    /// Logical command name passed to hooks, e.g. `calc`
    fn name(&self) -> &str;

    /// Runs the command with the config produced by the before phase
    async fn run(&self, args: &[String], config: &Map<String, Value>) -> anyhow::Result<CommandOutput>;
}

/// True when either phase would run for this host config
pub fn is_pipeline_active(config: &Map<String, Value>) -> bool {
    let (settings, _) = PipelineConfig::from_host_config(config);
    settings.is_active()
}

/// Runs before and after hooks around host commands
#[derive(Clone)]
pub struct HookPipeline {
    config_dir: PathBuf,
    loader: ScriptLoader,
}

impl HookPipeline {
    /// `config_dir` is the base for relative script paths
    pub fn new(config_dir: impl Into<PathBuf>, modules: Arc<HostModuleRegistry>) -> Self {
        Self {
            config_dir: config_dir.into(),
            loader: ScriptLoader::new(modules),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn loader(&self) -> &ScriptLoader {
        &self.loader
    }

    pub fn is_pipeline_active(&self, config: &Map<String, Value>) -> bool {
        is_pipeline_active(config)
    }

    /// Runs the before phase and returns the config the command should use.
    ///
    /// When the phase is inactive this returns `config` unchanged without
    /// touching the filesystem. When hooks fail and `failOnError` is off,
    /// successful deltas are still applied.
    pub async fn apply_before_command(
        &self,
        args: &[String],
        config: &Map<String, Value>,
        command: Option<&str>,
    ) -> Result<Map<String, Value>, HookAbort> {
        let settings = read_settings(config);
        if !settings.is_phase_active(Phase::Before) {
            return Ok(config.clone());
        }

        let context = ExecutionContext::before(args, config, command);
        match self.guarded_phase(Phase::Before, settings, context).await? {
            Some(outcome) => Ok(outcome.final_config),
            None => Ok(config.clone()),
        }
    }

    /// Like [`apply_before_command`](Self::apply_before_command), but ends the
    /// process with status 1 on abort
    pub async fn apply_before_command_or_exit(
        &self,
        args: &[String],
        config: &Map<String, Value>,
        command: Option<&str>,
    ) -> Map<String, Value> {
        match self.apply_before_command(args, config, command).await {
            Ok(config) => config,
            Err(abort) => abort.exit(),
        }
    }

    /// Runs the after phase. Hooks only observe; nothing is folded back.
    pub async fn apply_after_command(
        &self,
        args: &[String],
        config: &Map<String, Value>,
        output: &str,
        result: &Value,
        command: Option<&str>,
    ) -> Result<(), HookAbort> {
        let settings = read_settings(config);
        if !settings.is_phase_active(Phase::After) {
            return Ok(());
        }

        let context = ExecutionContext::after(args, config, output, result, command);
        self.guarded_phase(Phase::After, settings, context).await?;
        Ok(())
    }

    /// Like [`apply_after_command`](Self::apply_after_command), but ends the
    /// process with status 1 on abort
    pub async fn apply_after_command_or_exit(
        &self,
        args: &[String],
        config: &Map<String, Value>,
        output: &str,
        result: &Value,
        command: Option<&str>,
    ) {
        if let Err(abort) = self.apply_after_command(args, config, output, result, command).await {
            abort.exit()
        }
    }

    /// Before phase, then the command, then the after phase.
    ///
    /// A [`HookAbort`] is returned inside the `anyhow::Error` so callers can
    /// downcast it.
    pub async fn run_with_hooks(
        &self,
        command: &dyn HostCommand,
        args: &[String],
        config: &Map<String, Value>,
    ) -> anyhow::Result<CommandOutput> {
        let name = command.name();

        let config = self.apply_before_command(args, config, Some(name)).await?;
        let output = command.run(args, &config).await?;
        self.apply_after_command(args, &config, &output.output, &output.result, Some(name))
            .await?;

        Ok(output)
    }

    /// Runs a phase on its own task so that a panic anywhere in loading or
    /// execution is contained. `Ok(None)` means the caller keeps its input.
    async fn guarded_phase(
        &self,
        phase: Phase,
        settings: PipelineConfig,
        context: ExecutionContext,
    ) -> Result<Option<PipelineOutcome>, HookAbort> {
        let pipeline = self.clone();
        let fail_on_error = settings.fail_on_error;

        let task = tokio::spawn(async move { pipeline.run_phase(phase, &settings, &context).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("{} hooks stopped unexpectedly: {}", phase, e);
                if fail_on_error {
                    let cause = HookError::runtime("pipeline", format!("internal failure: {e}"));
                    Err(HookAbort::new(phase, vec![cause]))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn run_phase(
        &self,
        phase: Phase,
        settings: &PipelineConfig,
        context: &ExecutionContext,
    ) -> Result<Option<PipelineOutcome>, HookAbort> {
        let phase_config = settings.phase(phase);
        let paths = resolve_script_paths(phase_config, &self.config_dir);

        let options = LoadOptions {
            verbose: settings.verbose,
            validate_signature: true,
        };
        let loaded = self.loader.load_many(&paths, &options).await;

        for error in &loaded.errors {
            report_failure(settings.verbose, phase, error);
        }
        if !loaded.all_succeeded && settings.fail_on_error {
            return Err(HookAbort::new(phase, loaded.errors));
        }

        if loaded.callables.is_empty() {
            if settings.verbose {
                info!("No {} hooks loaded", phase);
            }
            return Ok(None);
        }

        if settings.verbose {
            info!("{} phase: {}", phase, loaded.summary());
        }

        let run_options = RunManyOptions {
            timeout_ms: phase_config.timeout_ms,
            fail_on_error: settings.fail_on_error,
            verbose: settings.verbose,
        };
        let outcome = run_many(&loaded.wrappers(), context, &run_options).await;

        for error in &outcome.errors {
            report_failure(settings.verbose, phase, error);
        }
        if settings.verbose {
            info!("{} phase: {}", phase, outcome.summary());
        } else {
            debug!("{} phase ({}): {}", phase, outcome.run_id, outcome.summary());
        }

        if !outcome.all_succeeded && settings.fail_on_error {
            return Err(HookAbort::new(phase, outcome.errors));
        }

        Ok(Some(outcome))
    }
}

/// Normalized pipeline settings; problems are logged, never fatal
fn read_settings(config: &Map<String, Value>) -> PipelineConfig {
    let (settings, problems) = PipelineConfig::from_host_config(config);
    for problem in problems {
        let error = HookError::ConfigValidation { message: problem };
        if settings.verbose {
            warn!("{}", error);
        } else {
            debug!("{}", error);
        }
    }
    settings
}

fn report_failure(verbose: bool, phase: Phase, error: &HookError) {
    if verbose {
        warn!("{} hook error: {}", phase, error);
    } else {
        debug!("{} hook error: {}", phase, error);
    }
}
