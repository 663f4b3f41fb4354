//! FFI safety wrappers: conversions between C strings and Rust strings.

use std::ffi::{CStr, CString, c_char, c_void};

use pluginserver_core::{AppError, AppResult};

use crate::traits::PdkHandle;

/// Reads a null-terminated UTF-8 string returned by a plugin accessor.
///
/// `what` names the accessor in error messages.
///
/// # Safety
/// `ptr` must be null or point to a null-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn read_c_string(ptr: *const c_char, what: &str) -> AppResult<String> {
    if ptr.is_null() {
        return Err(AppError::introspection(format!("{what} returned a null pointer")));
    }
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map(str::to_string)
        .map_err(|e| AppError::introspection(format!("{what} returned invalid UTF-8: {e}")))
}

/// Converts a Rust string to a `CString`, dropping interior null bytes.
pub fn to_c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Runs a phase handler on an instance created by `plugin_new`.
///
/// Null instances are ignored.
///
/// # Safety
/// `instance` must be null or a live pointer to a `T` created by the plugin's
/// constructor, not aliased for the duration of the call.
pub unsafe fn invoke_hook<T>(instance: *mut c_void, pdk: *mut c_void, hook: fn(&mut T, PdkHandle)) {
    if let Some(plugin) = unsafe { instance.cast::<T>().as_mut() } {
        hook(plugin, PdkHandle::from_raw(pdk));
    }
}
