//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use super::handlers::router;
use super::state::AppState;
use crate::error::{LungscanError, Result};

/// HTTP server for the LungScan API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Shared handler state
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!(addr = %self.addr, "Starting HTTP server for the LungScan API");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                LungscanError::Io(e)
            })
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!(
            addr = %self.addr,
            "Starting HTTP server for the LungScan API with graceful shutdown"
        );

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                LungscanError::Io(e)
            })
    }
}
