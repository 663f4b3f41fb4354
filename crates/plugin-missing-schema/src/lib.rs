//! A plugin library with `plugin_new` and `plugin_free` but no
//! `plugin_schema`. The plugin server must refuse to load it.

use std::ffi::c_void;

/// Creates a placeholder instance.
#[unsafe(no_mangle)]
pub extern "C" fn plugin_new() -> *mut c_void {
    Box::into_raw(Box::new(0u8)).cast()
}

/// Releases an instance created by `plugin_new`.
///
/// # Safety
/// `instance` must be null or come from `plugin_new` and not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn plugin_free(instance: *mut c_void) {
    if !instance.is_null() {
        drop(unsafe { Box::from_raw(instance.cast::<u8>()) });
    }
}
