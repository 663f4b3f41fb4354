//! Plugin server entry point.
//!
//! Either dumps plugin metadata and exits, or serves it over a Unix socket
//! until the gateway goes away.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use pluginserver_core::AppError;
use pluginserver_core::config::AppConfig;
use pluginserver_plugin::{DynamicLoader, InfoExtractor, ModuleLoader, PluginRegistry};
use pluginserver_rpc::supervisor::is_parent_alive;
use pluginserver_rpc::{ParentWatch, PluginServer};

mod cli;
mod dump;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", cli::version_text());
        return;
    }

    let config = match AppConfig::load(cli.config.as_deref(), cli.overrides()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let loader: Arc<dyn ModuleLoader> = Arc::new(DynamicLoader::new());

    if cli.is_dump() {
        let extractor = InfoExtractor::new(Arc::new(PluginRegistry::new(
            config.server.plugins_dir(),
            loader,
        )));
        let code = match run_dump(&cli, &extractor).await {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("Dump failed: {}", e);
                1
            }
        };
        std::process::exit(code);
    }

    if !config.server.has_prefix() {
        Cli::exit_missing_prefix();
    }

    if let Err(e) = run(config, loader).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging. Output goes to stderr; stdout carries dumps.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
        "pretty" => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
        _ => {
            fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }
}

/// Runs whichever dump mode was requested.
async fn run_dump(cli: &Cli, extractor: &InfoExtractor) -> Result<(), AppError> {
    let stdout = std::io::stdout();

    if let Some(name) = &cli.dump_plugin_info {
        return dump::dump_plugin_info(extractor, name, stdout.lock()).await;
    }

    let summary = dump::dump_all_plugins(extractor, stdout.lock()).await?;
    if !summary.failed.is_empty() {
        tracing::warn!(
            "Dumped {} plugin(s), skipped {}",
            summary.dumped,
            summary.failed.len()
        );
    }
    Ok(())
}

/// Serves plugin metadata until a signal arrives or the parent exits.
async fn run(config: AppConfig, loader: Arc<dyn ModuleLoader>) -> Result<(), AppError> {
    tracing::info!("Starting plugin server v{}", env!("CARGO_PKG_VERSION"));

    let server = PluginServer::new(&config.server, loader);
    tracing::info!(
        "Socket: {}, plugins: {}",
        server.socket_path().display(),
        server.plugins_dir().display()
    );
    tracing::info!("Parent is alive? {}", is_parent_alive());

    let listener = server.bind()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let parent_watch = if config.server.watch_parent {
        Some(ParentWatch::spawn(
            config.server.watch_interval(),
            shutdown_tx.clone(),
        ))
    } else {
        None
    };

    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let result = server.serve(listener, shutdown_rx).await;

    signals.abort();
    if let Some(watch) = parent_watch {
        watch.stop();
    }

    tracing::info!("Plugin server stopped");
    result
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
