//! RPC services exposed to the gateway.

use std::sync::Arc;

use async_trait::async_trait;

use pluginserver_core::{AppError, AppResult, DynamicValue};
use pluginserver_plugin::InfoExtractor;

/// A named group of RPC methods.
#[async_trait]
pub trait RpcService: Send + Sync + std::fmt::Debug + 'static {
    /// Service name, the part before the dot in `"plugin.GetPluginInfo"`.
    fn name(&self) -> &str;

    /// Invokes `method` with positional `params`.
    async fn call(&self, method: &str, params: Vec<DynamicValue>) -> AppResult<DynamicValue>;
}

/// The `"plugin"` service.
#[derive(Debug, Clone)]
pub struct PluginService {
    extractor: Arc<InfoExtractor>,
}

impl PluginService {
    /// Service name on the wire.
    pub const NAME: &'static str = "plugin";

    pub fn new(extractor: Arc<InfoExtractor>) -> Self {
        Self { extractor }
    }

    /// Returns the metadata record of one plugin, loading it on first use.
    pub async fn get_plugin_info(&self, name: &str) -> AppResult<DynamicValue> {
        let info = self.extractor.get_info(name).await?;
        Ok(info.to_value())
    }
}

#[async_trait]
impl RpcService for PluginService {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn call(&self, method: &str, params: Vec<DynamicValue>) -> AppResult<DynamicValue> {
        match method {
            "GetPluginInfo" => {
                let name = first_string(&params).ok_or_else(|| {
                    AppError::invalid_request("GetPluginInfo expects a plugin name")
                })?;
                self.get_plugin_info(name).await
            }
            other => Err(AppError::invalid_request(format!(
                "unknown method '{}.{}'",
                Self::NAME,
                other
            ))),
        }
    }
}

fn first_string(params: &[DynamicValue]) -> Option<&str> {
    params.first().and_then(DynamicValue::as_str)
}
