//! Routes `"<service>.<method>"` calls to registered services.

use std::collections::HashMap;
use std::sync::Arc;

use pluginserver_core::{AppError, AppResult, DynamicValue};

use crate::service::RpcService;

/// Service table keyed by service name.
#[derive(Debug, Default, Clone)]
pub struct RpcDispatcher {
    services: HashMap<String, Arc<dyn RpcService>>,
}

impl RpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its own name, replacing any previous one.
    pub fn register(&mut self, service: Arc<dyn RpcService>) {
        let name = service.name().to_string();
        tracing::debug!(service = %name, "Registered RPC service");
        self.services.insert(name, service);
    }

    /// Names of the registered services.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invokes `method` (e.g. `"plugin.GetPluginInfo"`).
    pub async fn dispatch(&self, method: &str, params: Vec<DynamicValue>) -> AppResult<DynamicValue> {
        let (service, call) = method
            .split_once('.')
            .ok_or_else(|| AppError::invalid_request(format!("malformed method name '{}'", method)))?;

        let service = self
            .services
            .get(service)
            .ok_or_else(|| AppError::invalid_request(format!("unknown service '{}'", service)))?;

        service.call(call, params).await
    }
}
