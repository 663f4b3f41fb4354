//! Example rate limiting plugin.
//!
//! Built as `librate_limit.so`; copy it into the plugins directory as
//! `rate-limit.so` so the plugin server reports it under that name.

use serde_json::json;

use pluginserver_plugin::prelude::*;

/// Per-consumer request limits.
#[derive(Debug, Clone)]
pub struct RateLimit {
    /// Requests allowed per second.
    pub second: Option<u64>,
    /// Requests allowed per minute.
    pub minute: Option<u64>,
    /// What identifies a consumer.
    pub limit_by: String,
    /// Requests seen by the access phase.
    pub seen: u64,
    /// Requests seen by the log phase.
    pub logged: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            second: None,
            minute: Some(60),
            limit_by: "consumer".to_string(),
            seen: 0,
            logged: 0,
        }
    }
}

impl GatewayPlugin for RateLimit {
    fn schema() -> serde_json::Value {
        json!({
            "type": "record",
            "fields": [
                {"second": {"type": "integer", "gt": 0}},
                {"minute": {"type": "integer", "gt": 0, "default": 60}},
                {"limit_by": {
                    "type": "string",
                    "default": "consumer",
                    "one_of": ["consumer", "credential", "ip"],
                }},
            ],
        })
    }

    fn access(&mut self, _pdk: PdkHandle) {
        self.seen += 1;
    }

    fn log(&mut self, _pdk: PdkHandle) {
        self.logged += 1;
    }
}

export_plugin!(
    plugin: RateLimit,
    version: env!("CARGO_PKG_VERSION"),
    priority: 901,
    phases: [access, log],
);

#[cfg(test)]
mod tests {
    use super::*;
    use pluginserver_core::DynamicValue;
    use pluginserver_plugin::ffi::safety::read_c_string;
    use pluginserver_plugin::module::parse_schema;

    #[test]
    fn test_exported_accessors() {
        let version = unsafe { read_c_string(plugin_version(), "plugin_version") }.expect("version");
        assert_eq!(version, "0.1.0");
        assert_eq!(plugin_priority(), 901);
    }

    #[test]
    fn test_exported_schema_is_valid_json() {
        let json = unsafe { read_c_string(plugin_schema(), "plugin_schema") }.expect("schema");
        let schema = parse_schema(&json).expect("parse");
        assert_eq!(schema.get("type"), Some(&DynamicValue::from("record")));
        assert_eq!(schema.get("fields").and_then(DynamicValue::as_array).map(<[_]>::len), Some(3));
    }

    #[test]
    fn test_hooks_run_against_instance() {
        let instance = plugin_new();
        assert!(!instance.is_null());

        unsafe {
            plugin_access(instance, std::ptr::null_mut());
            plugin_access(instance, std::ptr::null_mut());
            plugin_log(instance, std::ptr::null_mut());

            let plugin = &*instance.cast::<RateLimit>();
            assert_eq!(plugin.seen, 2);
            assert_eq!(plugin.logged, 1);
            assert_eq!(plugin.minute, Some(60));

            plugin_free(instance);
        }
    }
}
