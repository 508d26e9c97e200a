//! Stdio and streamable HTTP transports.

use crate::error::{Result, ServerError};
use crate::server::HelixServer;
use axum::Router;
use axum::routing::get;
use rmcp::ServiceExt as _;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tokio_util::sync::CancellationToken;

/// Serve one MCP session over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the session fails to initialize or ends abnormally.
pub async fn serve_stdio(server: HelixServer) -> Result<()> {
    tracing::info!("serving MCP over stdio");
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| ServerError::Transport(format!("stdio session failed to start: {e}")))?;
    running
        .waiting()
        .await
        .map_err(|e| ServerError::Transport(format!("stdio session ended abnormally: {e}")))?;
    Ok(())
}

/// `/mcp` (streamable HTTP) and `/health`.
pub fn router(server: HelixServer, ct: &CancellationToken) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );
    Router::new()
        .route("/health", get(health))
        .nest_service("/mcp", service)
}

async fn health() -> &'static str {
    "ok"
}

/// Serve streamable HTTP on `host:port` until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve_http(server: HelixServer, host: &str, port: u16) -> Result<()> {
    let ct = CancellationToken::new();
    let app = router(server, &ct);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Startup(format!("cannot bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "serving MCP over streamable HTTP at /mcp");

    let shutdown = ct.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .map_err(|e| ServerError::Transport(format!("http server failed: {e}")))?;
    tracing::info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
