//! Plugin metadata extraction.

use std::sync::Arc;

use serde::Serialize;

use pluginserver_core::{AppResult, DynamicValue};

use crate::phases::Phase;
use crate::registry::{LoadedPlugin, PluginRegistry};

/// Metadata describing one plugin, as reported to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginInfo {
    /// Module file name without extension.
    pub name: String,
    /// Implemented phases, in detection order.
    pub phases: Vec<Phase>,
    /// Execution priority, 0 when not exposed.
    pub priority: i64,
    /// Version string, empty when not exposed.
    pub version: String,
    /// Plugin schema accepted by the gateway.
    pub schema: DynamicValue,
}

impl PluginInfo {
    /// Converts to a dynamic map keyed like the serialized form.
    pub fn to_value(&self) -> DynamicValue {
        DynamicValue::map([
            ("Name", DynamicValue::from(self.name.as_str())),
            (
                "Phases",
                DynamicValue::Array(
                    self.phases
                        .iter()
                        .map(|phase| DynamicValue::from(phase.as_str()))
                        .collect(),
                ),
            ),
            ("Priority", DynamicValue::Integer(self.priority)),
            ("Version", DynamicValue::from(self.version.as_str())),
            ("Schema", self.schema.clone()),
        ])
    }
}

/// Builds [`PluginInfo`] records from registry modules.
#[derive(Debug, Clone)]
pub struct InfoExtractor {
    /// Registry that loads and caches modules.
    registry: Arc<PluginRegistry>,
}

impl InfoExtractor {
    /// Creates an extractor over a registry.
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Loads (or reuses) a plugin and describes it.
    pub async fn get_info(&self, name: &str) -> AppResult<PluginInfo> {
        let plugin = self.registry.load(name).await?;
        Self::describe(&plugin)
    }

    /// Inspects a loaded plugin's capability set.
    pub fn describe(plugin: &LoadedPlugin) -> AppResult<PluginInfo> {
        let module = plugin.module();

        let phases = Phase::ALL
            .into_iter()
            .filter(|phase| module.implements(*phase))
            .collect();

        let version = module.version().transpose()?.unwrap_or_default();
        let priority = module.priority().unwrap_or(0);
        let config = module.schema()?;

        Ok(PluginInfo {
            name: plugin.name().to_string(),
            phases,
            priority,
            version,
            schema: schema_envelope(plugin.name(), config),
        })
    }
}

/// Wraps a plugin's config schema in the gateway's plugin schema record.
fn schema_envelope(name: &str, config: DynamicValue) -> DynamicValue {
    DynamicValue::map([
        ("name", DynamicValue::from(name)),
        (
            "fields",
            DynamicValue::Array(vec![DynamicValue::map([("config", config)])]),
        ),
    ])
}
