//! Process lifecycle: tracing setup, shutdown signals and draining HTTP servers.
//!
//! # Graceful Shutdown
//!
//! When a shutdown signal is received (Ctrl+C or SIGTERM):
//! 1. The HTTP server stops accepting new connections
//! 2. In-flight requests get the configured grace period to finish
//! 3. The caller then stops its remaining background work

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        warn!("Tracing subscriber already installed");
    }
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires, so the
/// other signal still works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

/// Spawn a task that broadcasts once when [`shutdown_signal`] resolves.
///
/// Keep the returned sender alive for as long as receivers should wait.
#[must_use]
pub fn spawn_signal_listener() -> broadcast::Sender<()> {
    let (shutdown_tx, _) = broadcast::channel(1);
    let sender = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = sender.send(());
    });
    shutdown_tx
}

/// Resolves when `shutdown_rx` receives or its sender is dropped.
pub async fn wait_for(mut shutdown_rx: broadcast::Receiver<()>) {
    let _ = shutdown_rx.recv().await;
}

/// Serve `app` until `shutdown` resolves, then drain in-flight requests for
/// at most `grace`.
///
/// Returns early if the server itself fails before any shutdown request.
///
/// # Errors
///
/// Returns the server's I/O error, or an error if the server task panicked.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    grace: Duration,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let addr = listener.local_addr()?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });
    info!(%addr, "HTTP server listening");

    tokio::select! {
        result = &mut server => return flatten(result),
        () = shutdown => {}
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => {
            info!(%addr, "HTTP server drained");
            flatten(result)
        }
        Err(_) => {
            warn!(%addr, grace_secs = grace.as_secs(), "HTTP drain timed out, aborting");
            server.abort();
            Ok(())
        }
    }
}

fn flatten(result: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    result.map_err(io::Error::other)?
}

/// Router exposing `GET /health` and `GET /metrics` for processes without
/// their own HTTP API.
pub fn probe_router(metrics: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/health", get(|| async { (StatusCode::OK, "ok") }))
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

#[allow(clippy::unused_async)]
async fn render_metrics(State(metrics): State<Option<PrometheusHandle>>) -> (StatusCode, String) {
    match metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
