//! FFI ABI definitions for dynamic plugins.
//!
//! A plugin is a shared library exporting these C symbols:
//!
//! ```c
//! void*       plugin_new(void);                 // required
//! const char* plugin_schema(void);              // required, JSON text
//! void        plugin_free(void* instance);      // optional
//! int32_t     plugin_priority(void);            // optional
//! const char* plugin_version(void);             // optional
//! void        plugin_<phase>(void* instance, void* pdk);  // one per phase
//! ```
//!
//! Strings returned by the plugin stay owned by the plugin and must remain
//! valid for as long as the library is loaded.

use std::ffi::{c_char, c_void};

/// Constructor symbol.
pub const PLUGIN_NEW: &[u8] = b"plugin_new\0";
/// Destructor symbol for instances created by [`PLUGIN_NEW`].
pub const PLUGIN_FREE: &[u8] = b"plugin_free\0";
/// Schema builder symbol.
pub const PLUGIN_SCHEMA: &[u8] = b"plugin_schema\0";
/// Priority accessor symbol.
pub const PLUGIN_PRIORITY: &[u8] = b"plugin_priority\0";
/// Version accessor symbol.
pub const PLUGIN_VERSION: &[u8] = b"plugin_version\0";

/// Creates a plugin instance. Returns null on failure.
pub type PluginNewFn = unsafe extern "C" fn() -> *mut c_void;

/// Releases an instance returned by [`PluginNewFn`].
pub type PluginFreeFn = unsafe extern "C" fn(instance: *mut c_void);

/// Returns the configuration schema as a null-terminated JSON string.
pub type PluginSchemaFn = unsafe extern "C" fn() -> *const c_char;

/// Returns the execution priority.
pub type PluginPriorityFn = unsafe extern "C" fn() -> i32;

/// Returns the plugin version as a null-terminated string.
pub type PluginVersionFn = unsafe extern "C" fn() -> *const c_char;

/// Runs one phase handler against an instance and an opaque gateway handle.
pub type PluginHookFn = unsafe extern "C" fn(instance: *mut c_void, pdk: *mut c_void);
