//! audio-fetch-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Make sure ffmpeg is reachable (optionally downloading a managed copy).
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::services::YtDlpExtractor;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: AUDIO_FETCH_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "audio-fetch-server starting");
    if cfg.api_key.is_none() {
        warn!(
            "{} is not set; /download is unauthenticated",
            config::API_KEY_ENV
        );
    }

    // ── 3. ffmpeg ──────────────────────────────────────────────────────────────
    ensure_ffmpeg(cfg.ffmpeg_auto_download).await?;

    // ── 4. Shared application state ────────────────────────────────────────────
    let extractor = YtDlpExtractor::from_config(&cfg);
    info!(?extractor, work_root = %cfg.work_root.display(), "extractor configured");

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        extractor: Arc::new(extractor),
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("audio-fetch-server stopped");
    Ok(())
}

/// Check that ffmpeg runs; fetch a managed build first when allowed.
///
/// A missing ffmpeg is not fatal without auto-download: yt-dlp may still find
/// one on its own, and if not every request fails with its own diagnostic.
async fn ensure_ffmpeg(auto_download: bool) -> anyhow::Result<()> {
    if auto_download {
        info!("ensuring a managed ffmpeg build is available");
        tokio::task::spawn_blocking(ffmpeg_sidecar::download::auto_download).await??;
    }

    let installed = tokio::task::spawn_blocking(ffmpeg_sidecar::command::ffmpeg_is_installed).await?;
    if installed {
        info!(path = %ffmpeg_sidecar::paths::ffmpeg_path().display(), "ffmpeg found");
    } else {
        warn!("ffmpeg not found; MP3 post-processing will fail until it is installed");
    }
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => { s.recv().await; }
            Err(e)    => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
