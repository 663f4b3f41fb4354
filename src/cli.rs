//! Command line definition.

use clap::{CommandFactory, Parser};

use pluginserver_core::config::ConfigOverrides;

/// Plugin server sidecar for the Kong gateway.
#[derive(Debug, Parser)]
#[command(name = "go-pluginserver", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Kong prefix path. The socket is created directly inside it.
    #[arg(long = "kong-prefix", value_name = "PATH")]
    pub kong_prefix: Option<String>,

    /// Print one plugin's metadata as MessagePack and exit
    #[arg(long = "dump-plugin-info", value_name = "PLUGIN")]
    pub dump_plugin_info: Option<String>,

    /// Print every plugin's metadata as JSON and exit
    #[arg(long = "dump-all-plugins")]
    pub dump_all_plugins: bool,

    /// Directory holding plugin modules
    #[arg(long = "plugins-directory", value_name = "PATH")]
    pub plugins_directory: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Print version information and exit
    #[arg(long)]
    pub version: bool,
}

impl Cli {
    /// Flag values that take precedence over file and environment settings.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            prefix: self.kong_prefix.clone(),
            plugins_directory: self.plugins_directory.clone(),
        }
    }

    /// Whether a one-shot dump mode was requested.
    pub fn is_dump(&self) -> bool {
        self.dump_plugin_info.is_some() || self.dump_all_plugins
    }

    /// Reports a missing prefix as a usage error and exits with status 2.
    pub fn exit_missing_prefix() -> ! {
        Self::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "a non-empty --kong-prefix is required unless a dump is requested",
            )
            .exit()
    }
}

/// Text printed by `--version`.
pub fn version_text() -> String {
    format!(
        "Version: {}\nRuntime Version: rust {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_RUST_VERSION")
    )
}
