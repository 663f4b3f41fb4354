//! # pluginserver-core
//!
//! Core crate for the plugin server. Contains configuration schemas, the
//! dynamic value type carried over the wire, and the unified error system.
//!
//! This crate has **no** internal dependencies on other plugin server crates.

pub mod config;
pub mod error;
pub mod result;
pub mod value;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use value::DynamicValue;
