//! Shared helpers for socket-level tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use pluginserver_core::AppResult;
use pluginserver_core::config::ServerConfig;
use pluginserver_plugin::{BuiltinLoader, Phase, PluginModule, StaticModule};
use pluginserver_rpc::{MsgpackCodec, PluginServer};

/// A running server rooted in a temporary prefix.
pub struct TestServer {
    /// Keeps the prefix alive for the test's duration
    _prefix: TempDir,
    /// The server under test
    pub server: Arc<PluginServer>,
    /// Flip to `true` to stop the accept loop
    pub shutdown: watch::Sender<bool>,
    /// The accept loop task
    pub handle: JoinHandle<AppResult<()>>,
}

impl TestServer {
    /// Starts a server whose plugins directory holds one file per module.
    pub async fn start(modules: Vec<(String, Arc<dyn PluginModule>)>) -> Self {
        let prefix = tempfile::tempdir().expect("Failed to create prefix");
        let config = ServerConfig {
            prefix: prefix.path().to_string_lossy().into_owned(),
            ..ServerConfig::default()
        };

        let plugins_dir = config.plugins_dir();
        std::fs::create_dir_all(&plugins_dir).expect("Failed to create plugins dir");

        let mut loader = BuiltinLoader::new();
        for (name, module) in modules {
            std::fs::write(plugins_dir.join(format!("{name}.so")), b"")
                .expect("Failed to write module file");
            loader = loader.with_module(name, module);
        }

        let server = Arc::new(PluginServer::new(&config, Arc::new(loader)));
        let listener = server.bind().expect("Failed to bind");
        let (shutdown, rx) = watch::channel(false);

        let handle = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener, rx).await })
        };

        Self {
            _prefix: prefix,
            server,
            shutdown,
            handle,
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        self.server.socket_path().to_path_buf()
    }

    /// Connects and consumes the handshake frame.
    pub async fn connect(&self) -> TestClient {
        let (client, _) = self.connect_raw().await;
        client
    }

    /// Connects and returns the client together with the handshake frame.
    pub async fn connect_raw(&self) -> (TestClient, rmpv::Value) {
        let stream = UnixStream::connect(self.socket_path())
            .await
            .expect("Failed to connect");
        let mut framed = Framed::new(stream, MsgpackCodec::new());
        let handshake = recv(&mut framed).await.expect("Missing handshake");
        (
            TestClient {
                framed,
                next_msgid: 0,
            },
            handshake,
        )
    }
}

/// A MessagePack-RPC client over the test socket.
pub struct TestClient {
    pub framed: Framed<UnixStream, MsgpackCodec>,
    next_msgid: u32,
}

impl TestClient {
    /// Sends a request and returns `(error, result)` from the matching response.
    pub async fn call(&mut self, method: &str, params: Vec<rmpv::Value>) -> (rmpv::Value, rmpv::Value) {
        self.next_msgid += 1;
        let msgid = self.next_msgid;

        self.framed
            .send(rmpv::Value::Array(vec![
                rmpv::Value::from(0),
                rmpv::Value::from(msgid),
                rmpv::Value::from(method),
                rmpv::Value::Array(params),
            ]))
            .await
            .expect("Failed to send request");

        let response = recv(&mut self.framed).await.expect("Missing response");
        let mut fields = match response {
            rmpv::Value::Array(fields) if fields.len() == 4 => fields,
            other => panic!("Malformed response: {other}"),
        };
        assert_eq!(fields[0].as_u64(), Some(1), "response type");
        assert_eq!(fields[1].as_u64(), Some(u64::from(msgid)), "response msgid");

        let result = fields.pop().expect("result");
        let error = fields.pop().expect("error");
        (error, result)
    }

    /// Calls `plugin.GetPluginInfo`.
    pub async fn get_plugin_info(&mut self, name: &str) -> (rmpv::Value, rmpv::Value) {
        self.call("plugin.GetPluginInfo", vec![rmpv::Value::from(name)])
            .await
    }
}

/// Reads one frame, failing the test after five seconds.
pub async fn recv(framed: &mut Framed<UnixStream, MsgpackCodec>) -> Option<rmpv::Value> {
    tokio::time::timeout(Duration::from_secs(5), framed.next())
        .await
        .expect("Timed out waiting for frame")
        .map(|frame| frame.expect("Failed to decode frame"))
}

/// Looks up a string key in a MessagePack map.
pub fn field<'a>(value: &'a rmpv::Value, key: &str) -> Option<&'a rmpv::Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// A module implementing `phases` with an empty record schema.
pub fn module(phases: &[Phase], priority: i64) -> Arc<dyn PluginModule> {
    Arc::new(
        StaticModule::new(r#"{"type": "record", "fields": []}"#)
            .with_phases(phases)
            .with_priority(priority)
            .with_version("1.0.0"),
    )
}
