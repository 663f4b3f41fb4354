//! Plugin server configuration.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `PLUGINSERVER__*` environment variables. Command
//! line flags are applied last by the binary through [`ConfigOverrides`].

pub mod logging;
pub mod server;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::server::ServerConfig;

use crate::error::AppError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket and plugin directory settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line, applied over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Gateway prefix path.
    pub prefix: Option<String>,
    /// Explicit plugins directory.
    pub plugins_directory: Option<String>,
}

impl AppConfig {
    /// Load configuration from an optional file and the environment.
    pub fn load(file: Option<&str>, overrides: ConfigOverrides) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("PLUGINSERVER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.prefix", overrides.prefix)?
            .set_override_option("server.plugins_directory", overrides.plugins_directory)?
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
