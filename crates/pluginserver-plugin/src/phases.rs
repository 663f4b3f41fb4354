//! Request-processing phases a plugin may hook into.

use serde::{Deserialize, Serialize};

/// A named point in the gateway's request pipeline.
///
/// The declaration order is the order phases are detected and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// TLS handshake, before the request is read.
    Certificate,
    /// Before routing.
    Rewrite,
    /// After routing, before proxying upstream.
    Access,
    /// After the full upstream response is received.
    Response,
    /// Stream (L4) connections, before proxying.
    Preread,
    /// After the response has been sent to the client.
    Log,
}

impl Phase {
    /// Every phase, in detection order.
    pub const ALL: [Phase; 6] = [
        Self::Certificate,
        Self::Rewrite,
        Self::Access,
        Self::Response,
        Self::Preread,
        Self::Log,
    ];

    /// Returns the string name of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::Rewrite => "rewrite",
            Self::Access => "access",
            Self::Response => "response",
            Self::Preread => "preread",
            Self::Log => "log",
        }
    }

    /// Exported C symbol implementing this phase.
    pub fn symbol(&self) -> &'static [u8] {
        match self {
            Self::Certificate => b"plugin_certificate\0",
            Self::Rewrite => b"plugin_rewrite\0",
            Self::Access => b"plugin_access\0",
            Self::Response => b"plugin_response\0",
            Self::Preread => b"plugin_preread\0",
            Self::Log => b"plugin_log\0",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
