//! Convenience result type alias for the plugin server.

use crate::error::AppError;

/// A specialized `Result` type for plugin server operations.
pub type AppResult<T> = Result<T, AppError>;
