//! Entry-point extraction and the Lua-backed [`HookCallable`]

use giftwise_core::config::json_type_name;
use giftwise_core::outcome::HookReturn;
use mlua::{DeserializeOptions, Function, Lua, LuaSerdeExt, MultiValue, SerializeOptions, Value};
use serde_json::Value as JsonValue;

use crate::hook::HookCallable;
use crate::sandbox::Arity;

/// Named exports tried, in order, after the default export and the module itself
pub const EXPORT_CONVENTIONS: [&str; 5] = ["hookFunction", "hook", "default", "main", "execute"];

pub const MIN_PARAMS: usize = 3;
pub const MAX_PARAMS: usize = 5;

/// A hook function together with the Lua state that owns it
pub struct LuaHook {
    function: Function,
    arity: Arity,
    lua: Lua,
}

impl LuaHook {
    pub fn new(lua: Lua, function: Function, arity: Arity) -> Self {
        Self {
            function,
            arity,
            lua,
        }
    }
}

impl HookCallable for LuaHook {
    fn arity(&self) -> Option<usize> {
        Some(self.arity.params)
    }

    fn invoke(&self, args: Vec<JsonValue>) -> Result<HookReturn, String> {
        let mut values = Vec::with_capacity(args.len());
        for arg in &args {
            let value = json_to_lua(&self.lua, arg).map_err(|e| {
                format!("failed to pass arguments: {}", lua_error_message(&e))
            })?;
            values.push(value);
        }

        let returned: MultiValue = self
            .function
            .call(MultiValue::from_vec(values))
            .map_err(|e| lua_error_message(&e))?;

        let first = returned.into_iter().next().unwrap_or(Value::Nil);
        Ok(classify_return(&self.lua, first))
    }
}

/// Picks the hook entry point out of a loaded module.
///
/// Order: a `default` export, the module itself when it is a function, then
/// each name in [`EXPORT_CONVENTIONS`]. Returns the function and the
/// convention that matched.
///
/// Only plain functions are entry points. A table made callable through a
/// `__call` metamethod is rejected with its own message, since its declared
/// arity counts the table itself.
pub fn extract_callable(module: &Value) -> Result<(Function, &'static str), String> {
    if let Value::Table(exports) = module {
        if let Ok(Value::Function(function)) = exports.get::<Value>("default") {
            return Ok((function, "default export"));
        }
    }

    if let Value::Function(function) = module {
        return Ok((function.clone(), "module"));
    }

    if let Value::Table(exports) = module {
        for name in EXPORT_CONVENTIONS {
            if let Ok(Value::Function(function)) = exports.get::<Value>(name) {
                return Ok((function, name));
            }
        }
    }

    if let Value::Table(exports) = module {
        let has_call = exports
            .metatable()
            .and_then(|meta| meta.raw_get::<Value>("__call").ok())
            .is_some_and(|call| !call.is_nil());
        if has_call {
            return Err(
                "module is a callable table (__call metamethod); export a plain function instead"
                    .to_string(),
            );
        }
    }

    Err(format!(
        "no callable export found (module is a {}); tried default export, module function, {}",
        module.type_name(),
        EXPORT_CONVENTIONS.join(", ")
    ))
}

/// Coarse arity gate: 3 to 5 declared parameters
pub fn check_arity(arity: Arity) -> Result<(), String> {
    if (MIN_PARAMS..=MAX_PARAMS).contains(&arity.params) {
        Ok(())
    } else {
        Err(format!(
            "hook function must declare between {MIN_PARAMS} and {MAX_PARAMS} parameters, found {}",
            arity.params
        ))
    }
}

/// JSON to Lua, with `null` becoming `nil`
fn json_to_lua(lua: &Lua, value: &JsonValue) -> mlua::Result<Value> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

fn classify_return(lua: &Lua, value: Value) -> HookReturn {
    match value {
        Value::Nil => HookReturn::Empty,
        Value::Error(err) => HookReturn::Error(lua_error_message(&err)),
        Value::Table(table) => {
            let options = DeserializeOptions::new().deny_unsupported_types(false);
            match lua.from_value_with::<JsonValue>(Value::Table(table), options) {
                Ok(JsonValue::Object(map)) => HookReturn::Table(map),
                Ok(other) => HookReturn::Unexpected(format!("table ({})", json_type_name(&other))),
                Err(e) => HookReturn::Unexpected(format!("table that cannot be read ({e})")),
            }
        }
        other => HookReturn::Unexpected(other.type_name().to_string()),
    }
}

/// Message of a Lua error without the stack traceback
pub fn lua_error_message(err: &mlua::Error) -> String {
    match err {
        mlua::Error::CallbackError { cause, .. } => lua_error_message(cause),
        mlua::Error::RuntimeError(message) => strip_traceback(message),
        other => strip_traceback(&other.to_string()),
    }
}

fn strip_traceback(message: &str) -> String {
    message
        .split("\nstack traceback:")
        .next()
        .unwrap_or(message)
        .trim_end()
        .to_string()
}
