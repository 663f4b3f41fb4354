//! # pluginserver-rpc
//!
//! Serves plugin metadata to the gateway over a Unix socket.
//!
//! Every accepted connection first receives a handshake frame
//! `[2, "serverPid", <pid>]`, then speaks MessagePack-RPC against the
//! `"plugin"` service until the peer hangs up or sends a malformed frame.

pub mod codec;
pub mod dispatcher;
pub mod handshake;
pub mod message;
pub mod server;
pub mod service;
pub mod session;
pub mod supervisor;

pub use codec::MsgpackCodec;
pub use dispatcher::RpcDispatcher;
pub use server::PluginServer;
pub use service::{PluginService, RpcService};
pub use supervisor::ParentWatch;
