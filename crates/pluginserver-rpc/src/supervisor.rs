//! Parent process liveness.
//!
//! When the gateway dies, the server is re-parented to init (pid 1).

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Whether the process that started us is still around.
pub fn is_parent_alive() -> bool {
    std::os::unix::process::parent_id() != 1
}

/// Background task that requests shutdown once the parent is gone.
#[derive(Debug)]
pub struct ParentWatch {
    handle: JoinHandle<()>,
}

impl ParentWatch {
    /// Polls [`is_parent_alive`] every `interval`.
    pub fn spawn(interval: Duration, shutdown: watch::Sender<bool>) -> Self {
        Self::spawn_with(interval, shutdown, is_parent_alive)
    }

    /// Polls a custom liveness check every `interval`.
    pub fn spawn_with<F>(interval: Duration, shutdown: watch::Sender<bool>, is_alive: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if shutdown.is_closed() {
                    break;
                }
                if !is_alive() {
                    tracing::warn!("Parent process is gone, shutting down");
                    let _ = shutdown.send(true);
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Whether the watch loop has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops watching without touching the shutdown flag.
    pub fn stop(self) {
        self.handle.abort();
    }
}
