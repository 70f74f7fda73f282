//! Module formats and their loaders
//!
//! Two packaging conventions are supported:
//! - native (`.mlua`): the chunk returns its exports, a function or a table
//! - legacy (`.clua`): the chunk assigns `module.exports` (or fills `exports`)
//!
//! Plain `.lua` files take the format declared by the nearest `plugin.json`
//! above them (`{"type": "module"}` means native). Without a readable
//! manifest they are treated as legacy.

use mlua::{Lua, Result as LuaResult, Table, Value};
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

pub const NATIVE_EXTENSION: &str = "mlua";
pub const LEGACY_EXTENSION: &str = "clua";
pub const AMBIGUOUS_EXTENSION: &str = "lua";

/// Manifest consulted for `.lua` scripts
pub const MANIFEST_FILE: &str = "plugin.json";

/// Packaging convention of a hook script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Legacy,
    Native,
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleFormat::Legacy => f.write_str("legacy"),
            ModuleFormat::Native => f.write_str("native"),
        }
    }
}

/// What the file extension says about the format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Known(ModuleFormat),
    /// `.lua`, decided by the manifest
    Ambiguous,
}

/// Classifies a script by extension; `None` for unsupported extensions
pub fn classify_extension(path: &Path) -> Option<ScriptKind> {
    match path.extension()?.to_str()? {
        NATIVE_EXTENSION => Some(ScriptKind::Known(ModuleFormat::Native)),
        LEGACY_EXTENSION => Some(ScriptKind::Known(ModuleFormat::Legacy)),
        AMBIGUOUS_EXTENSION => Some(ScriptKind::Ambiguous),
        _ => None,
    }
}

/// Format declared by the nearest `plugin.json` above `script`
pub async fn manifest_format(script: &Path) -> ModuleFormat {
    for dir in script.ancestors().skip(1) {
        let manifest = dir.join(MANIFEST_FILE);
        match tokio::fs::read_to_string(&manifest).await {
            Ok(contents) => return parse_manifest_type(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                debug!("Unreadable manifest {}: {}", manifest.display(), e);
                return ModuleFormat::Legacy;
            }
        }
    }
    ModuleFormat::Legacy
}

fn parse_manifest_type(contents: &str) -> ModuleFormat {
    match serde_json::from_str::<serde_json::Value>(contents) {
        Ok(manifest) if manifest.get("type").and_then(|t| t.as_str()) == Some("module") => {
            ModuleFormat::Native
        }
        _ => ModuleFormat::Legacy,
    }
}

/// Evaluates a script source into its module value
pub trait ModuleLoader: Send + Sync {
    fn format(&self) -> ModuleFormat;

    /// Runs `source` in `lua` and returns the module (its exports)
    fn load(&self, lua: &Lua, chunk_name: &str, source: &str) -> LuaResult<Value>;
}

/// Loader for `.mlua` scripts: the module is the chunk's return value
pub struct NativeModuleLoader;

impl ModuleLoader for NativeModuleLoader {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Native
    }

    fn load(&self, lua: &Lua, chunk_name: &str, source: &str) -> LuaResult<Value> {
        lua.load(source).set_name(chunk_name).eval()
    }
}

/// Loader for `.clua` scripts: the module is `module.exports` after the chunk ran
pub struct LegacyModuleLoader;

impl ModuleLoader for LegacyModuleLoader {
    fn format(&self) -> ModuleFormat {
        ModuleFormat::Legacy
    }

    fn load(&self, lua: &Lua, chunk_name: &str, source: &str) -> LuaResult<Value> {
        let module: Table = lua.create_table()?;
        let exports: Table = lua.create_table()?;
        module.set("exports", exports.clone())?;

        lua.globals().set("module", module.clone())?;
        lua.globals().set("exports", exports)?;

        lua.load(source).set_name(chunk_name).exec()?;

        module.get("exports")
    }
}

/// Loader for a format
pub fn loader_for(format: ModuleFormat) -> &'static dyn ModuleLoader {
    match format {
        ModuleFormat::Native => &NativeModuleLoader,
        ModuleFormat::Legacy => &LegacyModuleLoader,
    }
}
