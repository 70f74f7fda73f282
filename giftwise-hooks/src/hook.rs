//! Callable seam between the loader and the engine
//!
//! The engine never knows how a hook was loaded. It only sees
//! [`HookCallable`] values wrapped in a [`HookWrapper`].

use giftwise_core::error::HookError;
use giftwise_core::outcome::HookReturn;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Smallest number of positional arguments a hook is called with
pub const MIN_HOOK_ARGS: usize = 3;

/// Something the engine can invoke as a hook.
///
/// `invoke` runs on a worker thread and may block for as long as the hook
/// takes; the engine enforces the time budget from the outside.
pub trait HookCallable: Send + Sync {
    /// Declared fixed parameter count, when the callable can report it
    fn arity(&self) -> Option<usize>;

    /// Calls the hook with positional arguments.
    ///
    /// `Err` carries the message of an error raised by the hook.
    fn invoke(&self, args: Vec<Value>) -> Result<HookReturn, String>;
}

/// A named hook as invoked by the engine
#[derive(Clone)]
pub struct HookWrapper {
    name: String,
    callable: Arc<dyn HookCallable>,
}

impl HookWrapper {
    pub fn new(name: impl Into<String>, callable: Arc<dyn HookCallable>) -> Self {
        Self {
            name: name.into(),
            callable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the wrapped hook.
    ///
    /// Fewer than [`MIN_HOOK_ARGS`] arguments is a signature error. A raised
    /// error comes back as [`HookError::PluginRuntime`] carrying this hook's name.
    pub fn call(&self, args: Vec<Value>) -> Result<HookReturn, HookError> {
        if args.len() < MIN_HOOK_ARGS {
            return Err(HookError::signature(
                &self.name,
                format!(
                    "hooks are called with at least {MIN_HOOK_ARGS} arguments, got {}",
                    args.len()
                ),
            ));
        }

        self.callable
            .invoke(args)
            .map_err(|message| HookError::runtime(&self.name, message))
    }
}

impl fmt::Debug for HookWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookWrapper")
            .field("name", &self.name)
            .field("arity", &self.callable.arity())
            .finish()
    }
}
