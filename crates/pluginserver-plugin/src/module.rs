//! The capability set every plugin module exposes.

use std::collections::BTreeSet;

use pluginserver_core::{AppError, AppResult, DynamicValue};

use crate::phases::Phase;

/// A loaded plugin module, independent of how it was loaded.
pub trait PluginModule: Send + Sync + std::fmt::Debug {
    /// Whether the module implements the given phase.
    fn implements(&self, phase: Phase) -> bool;

    /// Execution priority, if the module exposes one.
    fn priority(&self) -> Option<i64>;

    /// Version string, if the module exposes one.
    ///
    /// `Some(Err(_))` means the accessor exists but returned malformed data.
    fn version(&self) -> Option<AppResult<String>>;

    /// Configuration schema produced by the module's schema builder.
    fn schema(&self) -> AppResult<DynamicValue>;
}

/// Parses schema JSON text produced by a plugin.
pub fn parse_schema(json: &str) -> AppResult<DynamicValue> {
    serde_json::from_str::<serde_json::Value>(json)
        .map(DynamicValue::from)
        .map_err(|e| AppError::introspection(format!("schema is not valid JSON: {e}")))
}

/// A module whose capabilities are plain data, for statically linked plugins.
///
/// The schema is kept as JSON text and parsed on every request, exactly like
/// the text a shared library returns.
#[derive(Debug, Clone)]
pub struct StaticModule {
    /// Implemented phases.
    phases: BTreeSet<Phase>,
    /// Exposed priority.
    priority: Option<i64>,
    /// Exposed version.
    version: Option<String>,
    /// Schema JSON text.
    schema: String,
}

impl StaticModule {
    /// Creates a module with the given schema JSON and no phases.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            phases: BTreeSet::new(),
            priority: None,
            version: None,
            schema: schema.into(),
        }
    }

    /// Adds implemented phases.
    pub fn with_phases(mut self, phases: &[Phase]) -> Self {
        self.phases.extend(phases.iter().copied());
        self
    }

    /// Exposes a priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Exposes a version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl PluginModule for StaticModule {
    fn implements(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    fn priority(&self) -> Option<i64> {
        self.priority
    }

    fn version(&self) -> Option<AppResult<String>> {
        self.version.clone().map(Ok)
    }

    fn schema(&self) -> AppResult<DynamicValue> {
        parse_schema(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_module_capabilities() {
        let module = StaticModule::new(r#"{"fields": []}"#)
            .with_phases(&[Phase::Log, Phase::Access])
            .with_priority(10)
            .with_version("0.3.0");

        assert!(module.implements(Phase::Access));
        assert!(!module.implements(Phase::Rewrite));
        assert_eq!(module.priority(), Some(10));
        assert_eq!(module.version().and_then(Result::ok).as_deref(), Some("0.3.0"));
    }

    #[test]
    fn test_malformed_schema_is_introspection_error() {
        let module = StaticModule::new("{not json");
        let err = module.schema().expect_err("malformed");
        assert_eq!(err.kind, pluginserver_core::ErrorKind::PluginIntrospection);
    }
}
