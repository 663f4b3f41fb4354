//! Prelude for plugin authors.

pub use crate::export_plugin;
pub use crate::phases::Phase;
pub use crate::traits::{GatewayPlugin, PdkHandle};
