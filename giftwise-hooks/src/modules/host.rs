//! `host` module for hook scripts
//!
//! Small helpers that do not belong to the standard library:
//! - `host.version`: version of the giftwise host
//! - `host.now_ms()`: current Unix time in milliseconds
//! - `host.sleep(ms)`: blocks the hook for `ms` milliseconds

use crate::module::HostModule;
use mlua::prelude::*;
use std::time::Duration;

/// The `host` module
#[derive(Debug, Clone, Copy, Default)]
pub struct HostApiModule;

impl HostModule for HostApiModule {
    fn id(&self) -> &'static str {
        "host"
    }

    fn register(&self, lua: &Lua, plugin: &str) -> LuaResult<()> {
        let host = lua.create_table()?;

        host.set("version", env!("CARGO_PKG_VERSION"))?;
        host.set("plugin", plugin)?;

        host.set(
            "now_ms",
            lua.create_function(|_, ()| Ok(chrono::Utc::now().timestamp_millis()))?,
        )?;

        host.set(
            "sleep",
            lua.create_function(|_, ms: u64| {
                std::thread::sleep(Duration::from_millis(ms));
                Ok(())
            })?,
        )?;

        lua.globals().set(self.id(), host)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Host helpers for giftwise hooks
---@class host
---@field version string Version of the giftwise host
---@field plugin string Display name of the running hook
host = {}

---Current Unix time in milliseconds
---@return integer
function host.now_ms() end

---Block the hook for the given number of milliseconds
---@param ms integer
function host.sleep(ms) end
"#
        .to_string()
    }
}
