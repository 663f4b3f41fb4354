//! # pluginserver-plugin
//!
//! Plugin side of the plugin server. Provides:
//!
//! - Discovery of plugin modules (`*.so`) in a directory
//! - A registry that loads each module once, single-flight per name
//! - Module loaders: shared libraries via `libloading` (feature `dynamic`)
//!   and a builtin table of statically linked modules
//! - Metadata extraction into [`PluginInfo`]
//! - The C ABI and the [`export_plugin!`] macro for plugin authors

pub mod discovery;
pub mod ffi;
pub mod info;
pub mod loader;
pub mod macros;
pub mod module;
pub mod phases;
pub mod prelude;
pub mod registry;
pub mod traits;

pub use discovery::PluginNames;
pub use info::{InfoExtractor, PluginInfo};
pub use loader::{BuiltinLoader, ModuleLoader};
pub use module::{PluginModule, StaticModule};
pub use phases::Phase;
pub use registry::{LoadedPlugin, PluginRegistry};

#[cfg(feature = "dynamic")]
pub use loader::dynamic::{DynamicLoader, DynamicModule};
