//! Traits for writing plugins in Rust.
//!
//! Plugin authors implement [`GatewayPlugin`] and hand the type to
//! [`export_plugin!`](crate::export_plugin), which generates the C symbols the
//! server loads.

use std::ffi::c_void;

/// Opaque handle to the gateway's plugin development kit for one request.
#[derive(Debug, Clone, Copy)]
pub struct PdkHandle(*mut c_void);

impl PdkHandle {
    /// Wraps a raw handle passed across the C ABI.
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// Returns the raw handle.
    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    /// Whether the gateway passed no handle.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// A plugin written in Rust.
///
/// The instance is the plugin's configuration; the gateway creates one per
/// configured plugin. Only the phases listed in `export_plugin!` are exported,
/// so the default no-op handlers below are never reached through the ABI
/// unless listed.
pub trait GatewayPlugin: Default + 'static {
    /// JSON description of the accepted configuration fields.
    fn schema() -> serde_json::Value;

    /// TLS handshake handler.
    fn certificate(&mut self, _pdk: PdkHandle) {}

    /// Pre-routing handler.
    fn rewrite(&mut self, _pdk: PdkHandle) {}

    /// Access handler.
    fn access(&mut self, _pdk: PdkHandle) {}

    /// Buffered response handler.
    fn response(&mut self, _pdk: PdkHandle) {}

    /// Stream connection handler.
    fn preread(&mut self, _pdk: PdkHandle) {}

    /// Logging handler.
    fn log(&mut self, _pdk: PdkHandle) {}
}
