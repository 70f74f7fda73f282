//! Giftwise Hooks
//!
//! Lua hook pipeline for the Giftwise host. It includes:
//! - Host modules (`log`, `host`) installed into every hook state
//! - Per-script Lua states with a private arity probe
//! - Script loading for native and legacy module formats
//! - Sequential, time-bounded hook execution with config folding
//! - The pipeline that wraps host commands in before and after phases
//! - Stub generation for hook authors

pub mod engine;
pub mod hook;
pub mod loader;
pub mod module;
pub mod modules;
pub mod pipeline;
pub mod sandbox;

pub use engine::{RunManyOptions, RunOptions, run_many, run_one};
pub use hook::{HookCallable, HookWrapper};
pub use loader::{LoadManyResult, LoadOptions, LoadResult, LoadedScript, ModuleFormat, ScriptLoader};
pub use module::{HostModule, HostModuleRegistry};
pub use modules::{HostApiModule, LogModule, LogSink, TracingSink};
pub use pipeline::{CommandOutput, HookPipeline, HostCommand, is_pipeline_active};
pub use sandbox::create_plugin_sandbox;
