//! Socket lifecycle and the accept loop.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::watch;

use pluginserver_core::config::ServerConfig;
use pluginserver_core::{AppError, AppResult, ErrorKind};
use pluginserver_plugin::{InfoExtractor, ModuleLoader, PluginRegistry};

use crate::dispatcher::RpcDispatcher;
use crate::service::PluginService;
use crate::session::Session;

/// Everything a running plugin server needs, built once at startup.
#[derive(Debug)]
pub struct PluginServer {
    /// Where the listening socket lives
    socket_path: PathBuf,
    /// Loaded plugin cache
    registry: Arc<PluginRegistry>,
    /// Builds metadata records
    extractor: Arc<InfoExtractor>,
    /// Routes incoming calls
    dispatcher: Arc<RpcDispatcher>,
}

impl PluginServer {
    /// Creates a server with the `"plugin"` service registered.
    pub fn new(config: &ServerConfig, loader: Arc<dyn ModuleLoader>) -> Self {
        let registry = Arc::new(PluginRegistry::new(config.plugins_dir(), loader));
        let extractor = Arc::new(InfoExtractor::new(Arc::clone(&registry)));

        let mut dispatcher = RpcDispatcher::new();
        dispatcher.register(Arc::new(PluginService::new(Arc::clone(&extractor))));

        Self {
            socket_path: config.socket_path(),
            registry,
            extractor,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn plugins_dir(&self) -> &Path {
        self.registry.directory()
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn extractor(&self) -> &Arc<InfoExtractor> {
        &self.extractor
    }

    pub fn dispatcher(&self) -> &Arc<RpcDispatcher> {
        &self.dispatcher
    }

    /// Removes any stale socket file and binds a fresh listener.
    pub fn bind(&self) -> AppResult<UnixListener> {
        prepare_socket(&self.socket_path)?;

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Socket,
                format!("Failed to bind '{}'", self.socket_path.display()),
                e,
            )
        })?;

        tracing::info!(socket = %self.socket_path.display(), "Plugin server listening");
        Ok(listener)
    }

    /// Accepts connections until `shutdown` flips to `true`.
    ///
    /// Each connection gets the handshake frame and then its own task.
    pub async fn serve(
        &self,
        listener: UnixListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> AppResult<()> {
        let pid = std::process::id();
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, _) = result.map_err(|e| {
                        AppError::with_source(ErrorKind::Socket, "Failed to accept connection", e)
                    })?;

                    next_id += 1;
                    let mut session = Session::new(next_id, stream, Arc::clone(&self.dispatcher));
                    tokio::spawn(async move {
                        let id = session.id();
                        tracing::debug!(session = id, "Connection accepted");

                        if let Err(e) = session.greet(pid).await {
                            tracing::warn!(session = id, error = %e, "Handshake failed");
                            return;
                        }
                        if let Err(e) = session.run().await {
                            tracing::warn!(session = id, error = %e, "Session ended with error");
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Plugin server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Binds and serves until shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }
}

/// Deletes a leftover socket file. A missing file is fine.
pub fn prepare_socket(path: &Path) -> AppResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(socket = %path.display(), "Removed stale socket");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Socket,
            format!("Failed to remove stale socket '{}'", path.display()),
            e,
        )),
    }
}
