//! Graceful-shutdown HTTP server manager (spec overview: "a graceful-shutdown
//! HTTP server manager" sits alongside the connection pool and hook
//! pipeline). Grounded on the pack's own axum-server-with-oneshot-shutdown
//! pattern, generalized to also bound the drain by a deadline (§5
//! "graceful shutdown blocks until in-flight requests drain or the drain
//! deadline expires").

use axum::Router;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serves `app` on `addr` until `shutdown` resolves, then waits for
/// in-flight requests to drain for up to `drain_deadline` before returning.
pub async fn serve_with_graceful_shutdown<F>(
    app: Router,
    addr: SocketAddr,
    shutdown: F,
    drain_deadline: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dataway-http listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown);

    match tokio::time::timeout(drain_deadline, serve.into_future()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?drain_deadline, "graceful shutdown drain deadline expired, forcing exit");
            Ok(())
        }
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM — the usual signal set a
/// `serve_with_graceful_shutdown` caller waits on.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
