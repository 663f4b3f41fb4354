//! Socket and plugin directory configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the server listens and where it finds plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Gateway prefix path. The socket lives directly inside it.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Directory holding plugin modules. Defaults to `<prefix>/go_plugins`.
    #[serde(default)]
    pub plugins_directory: Option<String>,
    /// File name of the listening socket.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
    /// Shut down once the gateway process goes away.
    #[serde(default)]
    pub watch_parent: bool,
    /// How often the parent watch polls, in milliseconds.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            plugins_directory: None,
            socket_name: default_socket_name(),
            watch_parent: false,
            watch_interval_ms: default_watch_interval(),
        }
    }
}

impl ServerConfig {
    /// Full path of the listening socket.
    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(&self.prefix).join(&self.socket_name)
    }

    /// Directory searched for plugin modules.
    pub fn plugins_dir(&self) -> PathBuf {
        match &self.plugins_directory {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(&self.prefix).join("go_plugins"),
        }
    }

    /// Poll interval of the parent watch.
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms.max(1))
    }

    /// Whether a prefix was configured at all.
    pub fn has_prefix(&self) -> bool {
        !self.prefix.is_empty()
    }
}

fn default_prefix() -> String {
    "/usr/local/kong".to_string()
}

fn default_socket_name() -> String {
    "go_pluginserver.sock".to_string()
}

fn default_watch_interval() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugins_dir_falls_back_to_prefix() {
        let config = ServerConfig {
            prefix: "/opt/gw".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.plugins_dir(), PathBuf::from("/opt/gw/go_plugins"));
    }

    #[test]
    fn test_empty_plugins_directory_is_ignored() {
        let config = ServerConfig {
            prefix: "/opt/gw".to_string(),
            plugins_directory: Some(String::new()),
            ..ServerConfig::default()
        };
        assert_eq!(config.plugins_dir(), PathBuf::from("/opt/gw/go_plugins"));
    }

    #[test]
    fn test_empty_prefix() {
        let config = ServerConfig {
            prefix: String::new(),
            ..ServerConfig::default()
        };
        assert!(!config.has_prefix());
    }
}
