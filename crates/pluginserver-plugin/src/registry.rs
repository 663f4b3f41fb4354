//! Plugin registry: loads each module once and caches it for the process
//! lifetime.
//!
//! First loads are single-flight per name. Concurrent callers asking for the
//! same not-yet-loaded plugin share one open; a failed open leaves the slot
//! empty so the next call retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use pluginserver_core::{AppError, AppResult, ErrorKind};

use crate::discovery::{self, PluginNames};
use crate::loader::ModuleLoader;
use crate::module::PluginModule;

/// A module that has been opened successfully.
#[derive(Debug)]
pub struct LoadedPlugin {
    /// Plugin name (module file name without extension).
    name: String,
    /// Module file the plugin was opened from.
    path: PathBuf,
    /// The opened module.
    module: Arc<dyn PluginModule>,
}

impl LoadedPlugin {
    /// Plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capability set of the module.
    pub fn module(&self) -> &dyn PluginModule {
        self.module.as_ref()
    }
}

type Slot = Arc<OnceCell<Arc<LoadedPlugin>>>;

/// Registry of loaded plugins, keyed by name.
#[derive(Debug)]
pub struct PluginRegistry {
    /// Directory holding module files.
    directory: PathBuf,
    /// Opens module files.
    loader: Arc<dyn ModuleLoader>,
    /// Plugin name → load slot.
    slots: DashMap<String, Slot>,
}

impl PluginRegistry {
    /// Creates an empty registry over `directory`.
    pub fn new(directory: impl Into<PathBuf>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            directory: directory.into(),
            loader,
            slots: DashMap::new(),
        }
    }

    /// Directory holding module files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lists plugin names currently present in the directory.
    pub fn discover(&self) -> AppResult<PluginNames> {
        discovery::discover(&self.directory)
    }

    /// Loads a plugin by name, or returns the cached module.
    ///
    /// Fails with `PluginNotFound` when no module file exists for `name` and
    /// with `PluginLoad` when the file cannot be opened as a plugin.
    pub async fn load(&self, name: &str) -> AppResult<Arc<LoadedPlugin>> {
        if let Some(loaded) = self.get(name) {
            return Ok(loaded);
        }

        let path = self.resolve(name).await?;
        let slot: Slot = Arc::clone(&self.slots.entry(name.to_string()).or_default());

        let loaded = slot
            .get_or_try_init(|| self.open(name.to_string(), path))
            .await?;
        Ok(Arc::clone(loaded))
    }

    /// Returns a plugin only if it is already loaded.
    pub fn get(&self, name: &str) -> Option<Arc<LoadedPlugin>> {
        self.slots
            .get(name)
            .and_then(|slot| slot.value().get().map(Arc::clone))
    }

    /// Number of loaded plugins.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().initialized())
            .count()
    }

    /// Whether no plugin is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of loaded plugins, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .iter()
            .filter(|slot| slot.value().initialized())
            .map(|slot| slot.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Maps a plugin name to its module file, checking that it exists.
    async fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        if !is_valid_name(name) {
            return Err(AppError::plugin_not_found(format!(
                "'{name}' is not a valid plugin name"
            )));
        }

        let path = discovery::module_path(&self.directory, name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(AppError::plugin_not_found(format!(
                "'{}' is not a plugin module",
                path.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::plugin_not_found(
                format!("no plugin named '{}' in '{}'", name, self.directory.display()),
            )),
            Err(e) => Err(AppError::with_source(
                ErrorKind::PluginLoad,
                format!("can't access '{}': {}", path.display(), e),
                e,
            )),
        }
    }

    /// Opens a module on the blocking pool.
    async fn open(&self, name: String, path: PathBuf) -> AppResult<Arc<LoadedPlugin>> {
        debug!(plugin = %name, path = %path.display(), "Loading plugin");

        let loader = Arc::clone(&self.loader);
        let (name, path, opened) = tokio::task::spawn_blocking(move || {
            let opened = loader.open(&name, &path);
            (name, path, opened)
        })
        .await
        .map_err(|e| AppError::internal(format!("plugin loader task failed: {e}")))?;

        let module = opened.inspect_err(|e| {
            warn!(plugin = %name, error = %e, "Plugin load failed");
        })?;

        info!(plugin = %name, path = %path.display(), "Plugin loaded");

        Ok(Arc::new(LoadedPlugin { name, path, module }))
    }
}

/// A name must be a single, non-empty path component.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
