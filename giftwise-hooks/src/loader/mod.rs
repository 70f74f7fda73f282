//! Hook script loading
//!
//! Turns configured script paths into ready-to-call hooks:
//! 1. validate the path (absolute, existing regular file, known extension)
//! 2. pick the module format from the extension or `plugin.json`
//! 3. evaluate the script in a fresh Lua state with the host modules
//! 4. extract the entry point and check its declared parameters
//!
//! Scripts are loaded concurrently but results keep the configured order.

pub mod callable;
pub mod format;

use giftwise_core::config::PhaseConfig;
use giftwise_core::error::HookError;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::hook::HookWrapper;
use crate::module::HostModuleRegistry;
use crate::sandbox::{Arity, create_plugin_sandbox};

pub use callable::{EXPORT_CONVENTIONS, LuaHook, check_arity, extract_callable, lua_error_message};
pub use format::{
    LegacyModuleLoader, ModuleFormat, ModuleLoader, NativeModuleLoader, ScriptKind,
    classify_extension, loader_for, manifest_format,
};

/// Loader settings
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Report successful loads at info level
    pub verbose: bool,
    /// Reject entry points that do not declare 3 to 5 parameters
    pub validate_signature: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            validate_signature: true,
        }
    }
}

/// A script that loaded successfully
#[derive(Clone)]
pub struct LoadedScript {
    pub path: PathBuf,
    /// File name, used in logs and errors
    pub name: String,
    pub format: ModuleFormat,
    /// Which export convention supplied the entry point
    pub entry: &'static str,
    pub arity: Arity,
    pub callable: Arc<LuaHook>,
}

impl LoadedScript {
    pub fn wrapper(&self) -> HookWrapper {
        HookWrapper::new(self.name.clone(), self.callable.clone())
    }
}

impl std::fmt::Debug for LoadedScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedScript")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("entry", &self.entry)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Result of loading one script
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub success: bool,
    pub path: PathBuf,
    /// Known once the path validated
    pub format: Option<ModuleFormat>,
    pub script: Option<LoadedScript>,
    pub error: Option<HookError>,
}

impl LoadResult {
    fn loaded(script: LoadedScript) -> Self {
        Self {
            success: true,
            path: script.path.clone(),
            format: Some(script.format),
            script: Some(script),
            error: None,
        }
    }

    fn failed(path: &Path, format: Option<ModuleFormat>, error: HookError) -> Self {
        Self {
            success: false,
            path: path.to_path_buf(),
            format,
            script: None,
            error: Some(error),
        }
    }
}

/// Result of loading a list of scripts, in input order
#[derive(Debug, Clone)]
pub struct LoadManyResult {
    pub all_succeeded: bool,
    pub results: Vec<LoadResult>,
    pub callables: Vec<LoadedScript>,
    pub errors: Vec<HookError>,
    pub successful_paths: Vec<PathBuf>,
}

impl LoadManyResult {
    fn from_results(results: Vec<LoadResult>) -> Self {
        let callables: Vec<LoadedScript> = results.iter().filter_map(|r| r.script.clone()).collect();
        let errors: Vec<HookError> = results.iter().filter_map(|r| r.error.clone()).collect();
        let successful_paths = callables.iter().map(|s| s.path.clone()).collect();

        Self {
            all_succeeded: errors.is_empty(),
            results,
            callables,
            errors,
            successful_paths,
        }
    }

    /// Engine-facing wrappers for every loaded script
    pub fn wrappers(&self) -> Vec<HookWrapper> {
        self.callables.iter().map(LoadedScript::wrapper).collect()
    }

    /// Summary line for verbose output
    pub fn summary(&self) -> String {
        format!(
            "{} of {} hook script(s) loaded",
            self.callables.len(),
            self.results.len()
        )
    }
}

/// Loads hook scripts with a shared set of host modules
#[derive(Clone)]
pub struct ScriptLoader {
    modules: Arc<HostModuleRegistry>,
}

impl ScriptLoader {
    pub fn new(modules: Arc<HostModuleRegistry>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &HostModuleRegistry {
        &self.modules
    }

    /// Loads one script. Never panics or returns early: every failure is
    /// reported in the [`LoadResult`].
    pub async fn load_one(&self, path: &Path, options: &LoadOptions) -> LoadResult {
        let kind = match validate_path(path).await {
            Ok(kind) => kind,
            Err(e) => return LoadResult::failed(path, None, e),
        };

        let format = match kind {
            ScriptKind::Known(format) => format,
            ScriptKind::Ambiguous => manifest_format(path).await,
        };

        let name = display_name(path);
        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(e) => {
                let error = HookError::module_load(&name, format!("cannot read script: {e}"));
                return LoadResult::failed(path, Some(format), error);
            }
        };

        match self.instantiate(path, &name, format, &source, options) {
            Ok(script) => {
                if options.verbose {
                    info!("Loaded hook {} ({}, entry: {})", name, format, script.entry);
                } else {
                    debug!("Loaded hook {} ({}, entry: {})", name, format, script.entry);
                }
                LoadResult::loaded(script)
            }
            Err(e) => LoadResult::failed(path, Some(format), e),
        }
    }

    /// Loads every script concurrently; results follow the order of `paths`
    pub async fn load_many(&self, paths: &[PathBuf], options: &LoadOptions) -> LoadManyResult {
        let handles: Vec<_> = paths
            .iter()
            .cloned()
            .map(|path| {
                let loader = self.clone();
                let options = options.clone();
                tokio::spawn(async move { loader.load_one(&path, &options).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (handle, path) in handles.into_iter().zip(paths) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => LoadResult::failed(
                    path,
                    None,
                    HookError::module_load(display_name(path), format!("loader task failed: {e}")),
                ),
            };
            results.push(result);
        }

        LoadManyResult::from_results(results)
    }

    fn instantiate(
        &self,
        path: &Path,
        name: &str,
        format: ModuleFormat,
        source: &str,
        options: &LoadOptions,
    ) -> Result<LoadedScript, HookError> {
        let plugin = create_plugin_sandbox().map_err(|e| {
            HookError::module_load(name, format!("cannot create Lua state: {}", lua_error_message(&e)))
        })?;

        self.modules.register_all(plugin.lua(), name).map_err(|e| {
            HookError::module_load(name, format!("cannot install host modules: {}", lua_error_message(&e)))
        })?;

        let chunk_name = format!("@{}", path.display());
        let module = loader_for(format)
            .load(plugin.lua(), &chunk_name, source)
            .map_err(|e| HookError::module_load(name, lua_error_message(&e)))?;

        let (function, entry) =
            extract_callable(&module).map_err(|message| HookError::signature(name, message))?;

        let arity = plugin.arity(&function).map_err(|e| {
            HookError::signature(name, format!("cannot inspect parameters: {}", lua_error_message(&e)))
        })?;

        if options.validate_signature {
            check_arity(arity).map_err(|message| HookError::signature(name, message))?;
        }

        Ok(LoadedScript {
            path: path.to_path_buf(),
            name: name.to_string(),
            format,
            entry,
            arity,
            callable: Arc::new(LuaHook::new(plugin.into_lua(), function, arity)),
        })
    }
}

/// Resolves configured script entries against `base_dir`.
///
/// Absolute entries are kept, relative ones are joined to `base_dir`, blank
/// ones are dropped.
pub fn resolve_script_paths(phase: &PhaseConfig, base_dir: &Path) -> Vec<PathBuf> {
    phase
        .scripts
        .iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let path = Path::new(entry);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            }
        })
        .collect()
}

/// File name of a script, falling back to the full path
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn validate_path(path: &Path) -> Result<ScriptKind, HookError> {
    let shown = path.display().to_string();

    if path.as_os_str().is_empty() {
        return Err(HookError::path_validation(shown, "path is empty"));
    }
    if !path.is_absolute() {
        return Err(HookError::path_validation(shown, "path must be absolute"));
    }

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HookError::path_validation(shown, "file does not exist"));
        }
        Err(e) => {
            return Err(HookError::path_validation(shown, format!("cannot access file: {e}")));
        }
    };
    if !metadata.is_file() {
        return Err(HookError::path_validation(shown, "not a regular file"));
    }

    classify_extension(path).ok_or_else(|| {
        HookError::path_validation(
            shown,
            format!(
                "unsupported extension, expected .{}, .{} or .{}",
                format::NATIVE_EXTENSION,
                format::LEGACY_EXTENSION,
                format::AMBIGUOUS_EXTENSION
            ),
        )
    })
}

/// Report row for `hooks check`
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub path: PathBuf,
    pub success: bool,
    pub format: Option<ModuleFormat>,
    pub entry: Option<&'static str>,
    pub params: Option<usize>,
    pub error: Option<HookError>,
}

impl From<&LoadResult> for LoadReport {
    fn from(result: &LoadResult) -> Self {
        Self {
            path: result.path.clone(),
            success: result.success,
            format: result.format,
            entry: result.script.as_ref().map(|s| s.entry),
            params: result.script.as_ref().map(|s| s.arity.params),
            error: result.error.clone(),
        }
    }
}
