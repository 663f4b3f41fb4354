//! Convenience macros for plugin development.

/// Exports a [`GatewayPlugin`](crate::traits::GatewayPlugin) type through the
/// plugin C ABI.
///
/// Generates `plugin_new`, `plugin_free`, `plugin_schema`, `plugin_version`,
/// `plugin_priority`, and one `plugin_<phase>` symbol per listed phase. Use
/// it once per `cdylib`.
///
/// # Example
/// ```rust,ignore
/// #[derive(Default)]
/// struct RateLimit { hits: u64 }
///
/// impl GatewayPlugin for RateLimit {
///     fn schema() -> serde_json::Value {
///         serde_json::json!({"fields": [{"minute": {"type": "integer"}}]})
///     }
///     fn access(&mut self, _pdk: PdkHandle) { self.hits += 1; }
/// }
///
/// export_plugin!(
///     plugin: RateLimit,
///     version: "1.0.0",
///     priority: 901,
///     phases: [access, log]
/// );
/// ```
#[macro_export]
macro_rules! export_plugin {
    (
        plugin: $ty:ty,
        version: $version:expr,
        priority: $priority:expr,
        phases: [$($phase:ident),* $(,)?] $(,)?
    ) => {
        /// Creates a boxed plugin instance.
        #[unsafe(no_mangle)]
        pub extern "C" fn plugin_new() -> *mut ::std::ffi::c_void {
            let instance: ::std::boxed::Box<$ty> =
                ::std::boxed::Box::new(<$ty as ::std::default::Default>::default());
            ::std::boxed::Box::into_raw(instance).cast()
        }

        /// Releases an instance created by `plugin_new`.
        ///
        /// # Safety
        /// `instance` must be null or come from `plugin_new` and not be freed twice.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn plugin_free(instance: *mut ::std::ffi::c_void) {
            if !instance.is_null() {
                drop(unsafe { ::std::boxed::Box::from_raw(instance.cast::<$ty>()) });
            }
        }

        /// Returns the configuration schema as JSON text.
        #[unsafe(no_mangle)]
        pub extern "C" fn plugin_schema() -> *const ::std::ffi::c_char {
            static SCHEMA: ::std::sync::OnceLock<::std::ffi::CString> =
                ::std::sync::OnceLock::new();
            SCHEMA
                .get_or_init(|| {
                    let schema = <$ty as $crate::traits::GatewayPlugin>::schema();
                    $crate::ffi::safety::to_c_string(&schema.to_string())
                })
                .as_ptr()
        }

        /// Returns the plugin version.
        #[unsafe(no_mangle)]
        pub extern "C" fn plugin_version() -> *const ::std::ffi::c_char {
            static VERSION: ::std::sync::OnceLock<::std::ffi::CString> =
                ::std::sync::OnceLock::new();
            VERSION
                .get_or_init(|| $crate::ffi::safety::to_c_string($version))
                .as_ptr()
        }

        /// Returns the execution priority.
        #[unsafe(no_mangle)]
        pub extern "C" fn plugin_priority() -> i32 {
            $priority
        }

        $( $crate::export_plugin!(@hook $ty, $phase); )*
    };

    (@hook $ty:ty, certificate) => {
        $crate::export_plugin!(@symbol $ty, plugin_certificate, certificate);
    };
    (@hook $ty:ty, rewrite) => {
        $crate::export_plugin!(@symbol $ty, plugin_rewrite, rewrite);
    };
    (@hook $ty:ty, access) => {
        $crate::export_plugin!(@symbol $ty, plugin_access, access);
    };
    (@hook $ty:ty, response) => {
        $crate::export_plugin!(@symbol $ty, plugin_response, response);
    };
    (@hook $ty:ty, preread) => {
        $crate::export_plugin!(@symbol $ty, plugin_preread, preread);
    };
    (@hook $ty:ty, log) => {
        $crate::export_plugin!(@symbol $ty, plugin_log, log);
    };

    (@symbol $ty:ty, $symbol:ident, $method:ident) => {
        /// Phase handler.
        ///
        /// # Safety
        /// `instance` must be null or a live pointer returned by `plugin_new`.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $symbol(
            instance: *mut ::std::ffi::c_void,
            pdk: *mut ::std::ffi::c_void,
        ) {
            unsafe {
                $crate::ffi::safety::invoke_hook::<$ty>(
                    instance,
                    pdk,
                    <$ty as $crate::traits::GatewayPlugin>::$method,
                )
            }
        }
    };
}
