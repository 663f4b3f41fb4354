//! Module loaders: turn a module file into a [`PluginModule`].
//!
//! The registry owns path resolution and caching; a loader only opens.

#[cfg(feature = "dynamic")]
pub mod dynamic;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use pluginserver_core::{AppError, AppResult};

use crate::module::PluginModule;

/// Opens plugin modules. Called on the blocking thread pool.
pub trait ModuleLoader: Send + Sync + std::fmt::Debug {
    /// Opens the module `name` stored at `path`.
    fn open(&self, name: &str, path: &Path) -> AppResult<Arc<dyn PluginModule>>;
}

/// Builds a statically linked module.
pub type ModuleBuilder = Arc<dyn Fn() -> AppResult<Arc<dyn PluginModule>> + Send + Sync>;

/// Loader backed by a table of registered builders, keyed by plugin name.
///
/// The module file still has to exist in the plugins directory; its content
/// is ignored.
#[derive(Default)]
pub struct BuiltinLoader {
    /// Plugin name → builder.
    builders: HashMap<String, ModuleBuilder>,
}

impl BuiltinLoader {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder for a plugin name.
    pub fn with_builder<F>(mut self, name: impl Into<String>, builder: F) -> Self
    where
        F: Fn() -> AppResult<Arc<dyn PluginModule>> + Send + Sync + 'static,
    {
        self.builders.insert(name.into(), Arc::new(builder));
        self
    }

    /// Registers a fixed module for a plugin name.
    pub fn with_module(self, name: impl Into<String>, module: Arc<dyn PluginModule>) -> Self {
        self.with_builder(name, move || Ok(Arc::clone(&module)))
    }
}

impl ModuleLoader for BuiltinLoader {
    fn open(&self, name: &str, path: &Path) -> AppResult<Arc<dyn PluginModule>> {
        let builder = self.builders.get(name).ok_or_else(|| {
            AppError::plugin_load(format!(
                "'{}' is not a registered builtin module",
                path.display()
            ))
        })?;
        builder()
    }
}

impl std::fmt::Debug for BuiltinLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.builders.keys().collect();
        names.sort();
        f.debug_struct("BuiltinLoader")
            .field("builders", &names)
            .finish()
    }
}
