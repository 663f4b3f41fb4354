//! Unified error types for the plugin server.
//!
//! Every crate maps its failures into [`AppError`] so that startup code,
//! RPC sessions, and the dump commands all propagate one error type with `?`.
//! The [`ErrorKind`] decides how far an error travels: startup kinds abort the
//! process, call-level kinds become RPC faults, and encoding errors end only
//! the connection that produced them.

use std::fmt;
use thiserror::Error;

/// Error categories used across the plugin server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A required setting is missing or invalid.
    Configuration,
    /// The listening socket could not be prepared or bound.
    Socket,
    /// No module file exists for the requested plugin name.
    PluginNotFound,
    /// The module file exists but could not be opened as a plugin.
    PluginLoad,
    /// A plugin accessor returned malformed data.
    PluginIntrospection,
    /// A frame on the wire could not be encoded or decoded.
    Encoding,
    /// The caller asked for an unknown method or passed bad parameters.
    InvalidRequest,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Socket => write!(f, "SOCKET"),
            Self::PluginNotFound => write!(f, "PLUGIN_NOT_FOUND"),
            Self::PluginLoad => write!(f, "PLUGIN_LOAD"),
            Self::PluginIntrospection => write!(f, "PLUGIN_INTROSPECTION"),
            Self::Encoding => write!(f, "ENCODING"),
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The error type shared by every plugin server crate.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a socket error.
    pub fn socket(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Socket, message)
    }

    /// Create a plugin-not-found error.
    pub fn plugin_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginNotFound, message)
    }

    /// Create a plugin load error.
    pub fn plugin_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginLoad, message)
    }

    /// Create a plugin introspection error.
    pub fn introspection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginIntrospection, message)
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encoding, message)
    }

    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error should only fail the current call.
    pub fn is_call_level(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::PluginNotFound
                | ErrorKind::PluginLoad
                | ErrorKind::PluginIntrospection
                | ErrorKind::InvalidRequest
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Encoding, format!("JSON error: {err}"), err)
    }
}

impl From<rmpv::encode::Error> for AppError {
    fn from(err: rmpv::encode::Error) -> Self {
        Self::with_source(ErrorKind::Encoding, format!("MessagePack error: {err}"), err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
