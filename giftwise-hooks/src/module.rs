use mlua::prelude::*;

/// Trait for host modules exposed to hook scripts.
///
/// Each module provides functionality to Lua hooks. Modules must have a
/// unique identifier and register their functions into the Lua global scope
/// of every hook state.
///
/// # Example
///
/// ```rust
/// use giftwise_hooks::module::HostModule;
/// use mlua::prelude::*;
///
/// struct AnswerModule;
///
/// impl HostModule for AnswerModule {
///     fn id(&self) -> &'static str {
///         "answer"
///     }
///
///     fn register(&self, lua: &Lua, _plugin: &str) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("value", 42)?;
///         lua.globals().set(self.id(), table)?;
///         Ok(())
///     }
///
///     fn stubs(&self) -> String {
///         "---@meta\nanswer = { value = 42 }".to_string()
///     }
/// }
/// ```
pub trait HostModule: Send + Sync {
    /// Returns the unique identifier for this module.
    ///
    /// This identifier is used as the global variable name in Lua. For
    /// example, if `id()` returns `"log"`, hooks call `log.info(...)`.
    ///
    /// # Requirements
    /// - Must be a valid Lua identifier
    /// - Must be unique across all modules
    fn id(&self) -> &'static str;

    /// Registers this module's functions and values into a hook's Lua state.
    ///
    /// # Arguments
    /// * `lua` - The Lua state of one hook script
    /// * `plugin` - Display name of the hook being loaded
    fn register(&self, lua: &Lua, plugin: &str) -> LuaResult<()>;

    /// Generates Lua Language Server stubs for this module.
    ///
    /// The stub should start with `---@meta` to mark it as a definition file.
    fn stubs(&self) -> String;
}

/// Registry of host modules installed into every hook state
pub struct HostModuleRegistry {
    modules: Vec<Box<dyn HostModule>>,
}

impl HostModuleRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Registry with the standard `log` and `host` modules
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::modules::LogModule::new(crate::modules::TracingSink));
        registry.register(crate::modules::HostApiModule);
        registry
    }

    /// Registers a module
    ///
    /// # Panics
    /// Panics if a module with the same ID is already registered
    pub fn register<M: HostModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    /// Gets a module by its ID
    pub fn get(&self, id: &str) -> Option<&dyn HostModule> {
        self.modules
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.as_ref())
    }

    /// Registers all modules into a hook's Lua state
    ///
    /// # Errors
    /// Returns the first error encountered during registration
    pub fn register_all(&self, lua: &Lua, plugin: &str) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua, plugin)?;
        }
        Ok(())
    }

    /// Generates a combined stub file for all registered modules
    pub fn generate_stubs(&self) -> String {
        let mut stubs = String::new();
        for module in &self.modules {
            stubs.push_str(&module.stubs());
            stubs.push_str("\n\n");
        }
        stubs
    }
}

impl Default for HostModuleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestModule;

    impl HostModule for TestModule {
        fn id(&self) -> &'static str {
            "test"
        }

        fn register(&self, lua: &Lua, plugin: &str) -> LuaResult<()> {
            let table = lua.create_table()?;
            table.set("value", 42)?;
            table.set("plugin", plugin)?;
            lua.globals().set(self.id(), table)?;
            Ok(())
        }

        fn stubs(&self) -> String {
            "---@meta\n---@class test\ntest = {}".to_string()
        }
    }

    #[test]
    fn test_module_registration() {
        let mut registry = HostModuleRegistry::new();
        registry.register(TestModule);

        assert!(registry.get("test").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut registry = HostModuleRegistry::new();
        registry.register(TestModule);
        registry.register(TestModule);
    }

    #[test]
    fn test_register_all_passes_plugin_name() {
        let mut registry = HostModuleRegistry::new();
        registry.register(TestModule);

        let lua = Lua::new();
        registry.register_all(&lua, "tagger.lua").unwrap();
        let plugin: String = lua.load("return test.plugin").eval().unwrap();
        assert_eq!(plugin, "tagger.lua");
    }

    #[test]
    fn test_defaults_and_stubs() {
        let registry = HostModuleRegistry::with_defaults();
        assert!(registry.get("log").is_some());
        assert!(registry.get("host").is_some());

        let stubs = registry.generate_stubs();
        assert!(stubs.contains("---@meta"));
        assert!(stubs.contains("function log.info"));
        assert!(stubs.contains("function host.sleep"));
    }
}
