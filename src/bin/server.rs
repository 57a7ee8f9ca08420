#![forbid(unsafe_code)]

//! HTTP server relaying yt-dlp metadata as JSON.
//!
//! Each request spawns its own extractor process; nothing is cached or shared
//! between requests.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tubemeta::{
    api::{AppState, router},
    config::{RuntimeOverrides, RuntimeSettings, resolve_runtime_settings},
    process::{Launcher, SystemLauncher, probe_version},
    security::ensure_not_root,
    telemetry::{LogFormat, init_logging, install_panic_hook},
};

#[derive(Debug, Parser)]
#[command(name = "tubemeta-server", version, about = "Serve yt-dlp metadata over HTTP")]
struct ServerArgs {
    /// Address to bind (TUBEMETA_HOST).
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (TUBEMETA_PORT / PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Path to the yt-dlp executable (YTDLP_PATH).
    #[arg(long)]
    extractor: Option<PathBuf>,
    /// Largest stdout accepted from a single run, in bytes.
    #[arg(long)]
    max_output_bytes: Option<usize>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    /// Start even when running as root.
    #[arg(long)]
    allow_root: bool,
    /// Dotenv file consulted after the process environment.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl ServerArgs {
    fn into_overrides(self) -> RuntimeOverrides {
        RuntimeOverrides {
            host: self.host,
            port: self.port,
            extractor: self.extractor,
            max_output_bytes: self.max_output_bytes,
            log_format: self.log_format,
            allow_root: self.allow_root,
            env_path: self.env_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = resolve_runtime_settings(ServerArgs::parse().into_overrides())?;

    init_logging(settings.log_format)?;
    install_panic_hook();
    ensure_not_root("tubemeta-server", settings.allow_root)?;

    let RuntimeSettings {
        host,
        port,
        extractor,
        max_output_bytes,
        ..
    } = settings;

    let launcher: Arc<dyn Launcher> = Arc::new(SystemLauncher::new(max_output_bytes));
    let app = router(AppState::new(launcher.clone(), extractor.clone()));

    let addr = SocketAddr::new(host, port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(%addr, extractor = %extractor.display(), "server listening");

    // Diagnostic only: a broken extractor is reported per request anyway.
    tokio::spawn(async move {
        match probe_version(launcher.as_ref(), &extractor).await {
            Ok(version) => tracing::info!(%version, "yt-dlp version check successful"),
            Err(err) => tracing::warn!(
                extractor = %extractor.display(),
                error = %err,
                "yt-dlp version check failed; ensure it is installed and executable"
            ),
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
