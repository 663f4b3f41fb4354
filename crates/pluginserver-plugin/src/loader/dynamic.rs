//! Shared library loader using `libloading` (feature `dynamic`).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use tracing::{debug, info};

use pluginserver_core::{AppError, AppResult, DynamicValue, ErrorKind};

use crate::ffi::abi::{
    PLUGIN_FREE, PLUGIN_NEW, PLUGIN_PRIORITY, PLUGIN_SCHEMA, PLUGIN_VERSION, PluginFreeFn,
    PluginHookFn, PluginNewFn, PluginPriorityFn, PluginSchemaFn, PluginVersionFn,
};
use crate::ffi::safety::read_c_string;
use crate::loader::ModuleLoader;
use crate::module::{PluginModule, parse_schema};
use crate::phases::Phase;

/// Loads plugins from shared libraries (.so).
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicLoader;

impl DynamicLoader {
    /// Creates a new dynamic loader.
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for DynamicLoader {
    fn open(&self, name: &str, path: &Path) -> AppResult<Arc<dyn PluginModule>> {
        // SAFETY: loading a plugin runs its initializers; only trusted plugins
        // belong in the plugins directory.
        let module = unsafe { DynamicModule::open(path) }?;
        info!(
            plugin = %name,
            path = %path.display(),
            hooks = module.hooks.len(),
            "Dynamic plugin loaded"
        );
        Ok(Arc::new(module))
    }
}

/// A plugin module backed by an open shared library.
///
/// Holds the resolved function table. The library is declared last so it is
/// dropped after every function pointer into it.
pub struct DynamicModule {
    /// `plugin_schema`.
    schema: PluginSchemaFn,
    /// `plugin_priority`, if exported.
    priority: Option<PluginPriorityFn>,
    /// `plugin_version`, if exported.
    version: Option<PluginVersionFn>,
    /// Exported phase handlers.
    hooks: BTreeMap<Phase, PluginHookFn>,
    /// Keeps the library mapped.
    _library: Library,
}

impl DynamicModule {
    /// Opens a shared library and resolves the plugin function table.
    ///
    /// The constructor is invoked once to prove the module initializes; the
    /// instance is released right away through `plugin_free` when exported.
    ///
    /// # Safety
    /// Loads and runs arbitrary native code. The library must export the
    /// plugin ABI symbols with the signatures in [`crate::ffi::abi`].
    pub unsafe fn open(path: &Path) -> AppResult<Self> {
        let library = unsafe { Library::new(path) }.map_err(|e| {
            AppError::with_source(
                ErrorKind::PluginLoad,
                format!("Failed to open plugin library '{}': {}", path.display(), e),
                e,
            )
        })?;

        let constructor: PluginNewFn = unsafe { required(&library, PLUGIN_NEW, path) }?;
        let schema: PluginSchemaFn = unsafe { required(&library, PLUGIN_SCHEMA, path) }?;
        let free: Option<PluginFreeFn> = unsafe { optional(&library, PLUGIN_FREE) };
        let priority: Option<PluginPriorityFn> = unsafe { optional(&library, PLUGIN_PRIORITY) };
        let version: Option<PluginVersionFn> = unsafe { optional(&library, PLUGIN_VERSION) };

        let hooks: BTreeMap<Phase, PluginHookFn> = Phase::ALL
            .into_iter()
            .filter_map(|phase| {
                unsafe { optional::<PluginHookFn>(&library, phase.symbol()) }.map(|f| (phase, f))
            })
            .collect();

        let instance = unsafe { constructor() };
        if instance.is_null() {
            return Err(AppError::plugin_load(format!(
                "Plugin '{}' constructor returned null",
                path.display()
            )));
        }
        if let Some(free) = free {
            unsafe { free(instance) };
        }

        debug!(path = %path.display(), "Plugin function table resolved");

        Ok(Self {
            schema,
            priority,
            version,
            hooks,
            _library: library,
        })
    }
}

/// Resolves a symbol the plugin must export.
unsafe fn required<T: Copy>(library: &Library, symbol: &[u8], path: &Path) -> AppResult<T> {
    let resolved = unsafe { library.get::<T>(symbol) }.map_err(|e| {
        AppError::with_source(
            ErrorKind::PluginLoad,
            format!(
                "Plugin '{}' missing '{}' symbol: {}",
                path.display(),
                symbol_name(symbol),
                e
            ),
            e,
        )
    })?;
    Ok(*resolved)
}

/// Resolves a symbol the plugin may export.
unsafe fn optional<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
    unsafe { library.get::<T>(symbol) }.ok().map(|resolved| *resolved)
}

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

impl PluginModule for DynamicModule {
    fn implements(&self, phase: Phase) -> bool {
        self.hooks.contains_key(&phase)
    }

    fn priority(&self) -> Option<i64> {
        self.priority.map(|f| i64::from(unsafe { f() }))
    }

    fn version(&self) -> Option<AppResult<String>> {
        self.version
            .map(|f| unsafe { read_c_string(f(), "plugin_version") })
    }

    fn schema(&self) -> AppResult<DynamicValue> {
        let json = unsafe { read_c_string((self.schema)(), "plugin_schema") }?;
        parse_schema(&json)
    }
}

impl std::fmt::Debug for DynamicModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicModule")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("has_priority", &self.priority.is_some())
            .field("has_version", &self.version.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_name_strips_nul() {
        assert_eq!(symbol_name(PLUGIN_SCHEMA), "plugin_schema");
        assert_eq!(symbol_name(b"plugin_log"), "plugin_log");
    }

    #[test]
    fn test_garbage_file_is_load_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.so");
        std::fs::write(&path, b"not an elf file").expect("write");

        let err = DynamicLoader::new()
            .open("garbage", &path)
            .expect_err("not a shared library");
        assert_eq!(err.kind, ErrorKind::PluginLoad);
    }
}
