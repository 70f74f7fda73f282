//! Giftwise Core
//!
//! Core types for the Giftwise gift suggestion tool and its hook pipeline.
//!
//! This crate contains:
//! - Pipeline configuration and its validator
//! - The execution context handed to every hook
//! - Per-hook and per-phase outcomes
//! - The hook error taxonomy
//! - The gift-amount arithmetic used by the `calc` command
//!
//! Nothing here depends on Lua; the `giftwise-hooks` crate builds on these types.

pub mod config;
pub mod context;
pub mod error;
pub mod gift;
pub mod log;
pub mod outcome;

pub use config::{Phase, PhaseConfig, PipelineConfig};
pub use context::ExecutionContext;
pub use error::{HookAbort, HookError};
pub use outcome::{HookReturn, PipelineOutcome, PluginOutcome};
