//! Logging module for hook scripts
//!
//! Hooks write through `log.debug/info/warning/error`. Where the messages end
//! up is decided by a [`LogSink`]:
//! - CLI: [`TracingSink`], forwarding to `tracing` under the `giftwise_plugin` target
//! - Tests: an in-memory sink

use crate::module::HostModule;
use giftwise_core::log::LogLevel;
use mlua::prelude::*;
use std::sync::{Arc, Mutex};

/// Trait for log sinks
///
/// Implementations must be Send to work with Lua's threading model.
pub trait LogSink: Send + Sync {
    /// Write a log message on behalf of `plugin`
    fn write(&mut self, plugin: &str, level: LogLevel, message: &str);
}

/// Forwards hook messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&mut self, plugin: &str, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "giftwise_plugin", plugin, "{}", message),
            LogLevel::Info => tracing::info!(target: "giftwise_plugin", plugin, "{}", message),
            LogLevel::Warning => tracing::warn!(target: "giftwise_plugin", plugin, "{}", message),
            LogLevel::Error => tracing::error!(target: "giftwise_plugin", plugin, "{}", message),
        }
    }
}

/// Logging module for hook scripts
pub struct LogModule<S: LogSink> {
    sink: Arc<Mutex<S>>,
}

impl<S: LogSink> LogModule<S> {
    /// Creates a new LogModule with the provided sink
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

impl<S: LogSink + 'static> HostModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua, plugin: &str) -> LuaResult<()> {
        let log_table = lua.create_table()?;

        for (name, level) in [
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warning", LogLevel::Warning),
            ("error", LogLevel::Error),
        ] {
            let sink = self.sink.clone();
            let plugin = plugin.to_string();
            log_table.set(
                name,
                lua.create_function(move |_, msg: String| {
                    sink.lock()
                        .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
                        .write(&plugin, level, &msg);
                    Ok(())
                })?,
            )?;
        }

        lua.globals().set(self.id(), log_table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Logging for giftwise hooks
---@class log
log = {}

---Log a debug message
---@param msg string The message to log
function log.debug(msg) end

---Log an info message
---@param msg string The message to log
function log.info(msg) end

---Log a warning message
---@param msg string The message to log
function log.warning(msg) end

---Log an error message
---@param msg string The message to log
function log.error(msg) end
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Messages = Arc<Mutex<Vec<(String, LogLevel, String)>>>;

    struct TestLogSink {
        messages: Messages,
    }

    impl TestLogSink {
        fn new() -> (Self, Messages) {
            let messages = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    messages: messages.clone(),
                },
                messages,
            )
        }
    }

    impl LogSink for TestLogSink {
        fn write(&mut self, plugin: &str, level: LogLevel, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((plugin.to_string(), level, message.to_string()));
        }
    }

    #[test]
    fn test_log_collection() {
        let (sink, messages) = TestLogSink::new();
        let lua = Lua::new();
        let module = LogModule::new(sink);

        module.register(&lua, "audit.lua").unwrap();

        lua.load(r#"log.info("test info message")"#).exec().unwrap();
        lua.load(r#"log.error("test error message")"#).exec().unwrap();

        let logs = messages.lock().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].0, "audit.lua");
        assert_eq!(logs[0].1, LogLevel::Info);
        assert_eq!(logs[0].2, "test info message");
        assert_eq!(logs[1].1, LogLevel::Error);
    }

    #[test]
    fn test_log_all_levels() {
        let (sink, messages) = TestLogSink::new();
        let lua = Lua::new();
        LogModule::new(sink).register(&lua, "levels.lua").unwrap();

        lua.load(r#"log.debug("debug")"#).exec().unwrap();
        lua.load(r#"log.info("info")"#).exec().unwrap();
        lua.load(r#"log.warning("warning")"#).exec().unwrap();
        lua.load(r#"log.error("error")"#).exec().unwrap();

        let levels: Vec<LogLevel> = messages.lock().unwrap().iter().map(|m| m.1).collect();
        assert_eq!(
            levels,
            vec![LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error]
        );
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        let lua = Lua::new();
        LogModule::new(TracingSink).register(&lua, "plain.lua").unwrap();
        lua.load(r#"log.debug("a") log.info("b") log.warning("c") log.error("d")"#)
            .exec()
            .unwrap();
    }

    #[test]
    fn test_log_module_stubs() {
        let module = LogModule::new(TracingSink);
        let stubs = module.stubs();

        assert!(stubs.contains("---@meta"));
        assert!(stubs.contains("log = {}"));
        assert!(stubs.contains("function log.warning"));
    }
}
