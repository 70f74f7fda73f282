//! Lua state creation for hook scripts
//!
//! Every hook script is loaded into its own Lua state. Hooks get the safe
//! standard libraries (`table`, `string`, `math`, `utf8`, `coroutine`, `io`,
//! `os`, `package`). Filesystem and network access are NOT restricted.
//!
//! The `debug` library is opened only long enough to keep a private handle
//! to `debug.getinfo`, which the loader uses to read a function's declared
//! parameter count. It is removed from the globals before any script runs.

use mlua::{Function, Lua, LuaOptions, Result as LuaResult, StdLib, Table};

/// Declared parameters of a Lua function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Number of fixed parameters
    pub params: usize,
    /// Whether the function also takes `...`
    pub is_vararg: bool,
}

/// A fresh Lua state for one hook script
pub struct PluginLua {
    getinfo: Function,
    lua: Lua,
}

impl PluginLua {
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Reads the declared parameter count of `function`
    pub fn arity(&self, function: &Function) -> LuaResult<Arity> {
        let info: Table = self.getinfo.call((function.clone(), "u"))?;
        Ok(Arity {
            params: info.get("nparams")?,
            is_vararg: info.get("isvararg")?,
        })
    }

    /// Gives up the `getinfo` handle and returns the state
    pub fn into_lua(self) -> Lua {
        self.lua
    }
}

/// Create a Lua state for a hook script
///
/// # Example
/// ```no_run
/// use giftwise_hooks::sandbox::create_plugin_sandbox;
///
/// let plugin = create_plugin_sandbox()?;
/// let f: mlua::Function = plugin.lua().load("return function(a, b, c) end").eval()?;
/// assert_eq!(plugin.arity(&f)?.params, 3);
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_plugin_sandbox() -> LuaResult<PluginLua> {
    // `debug` cannot be opened through the safe constructor
    let lua = unsafe { Lua::unsafe_new_with(StdLib::ALL_SAFE | StdLib::DEBUG, LuaOptions::default()) };

    let debug: Table = lua.globals().get("debug")?;
    let getinfo: Function = debug.get("getinfo")?;

    lua.globals().set("debug", mlua::Nil)?;
    if let Ok(loaded) = lua.globals().get::<Table>("package").and_then(|p| p.get::<Table>("loaded")) {
        loaded.set("debug", mlua::Nil)?;
    }

    Ok(PluginLua { getinfo, lua })
}
