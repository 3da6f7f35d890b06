//! API router and server assembly.

use std::net::SocketAddr;

use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpSocket;
use tower_http::trace::TraceLayer;

use super::handlers::{relay, status, AppState};
use crate::error::{RelayError, Result};

/// Create the API router with all routes configured.
///
/// `/relay` is routed for any method; the handler itself folds non-POST into
/// the uniform rejection instead of letting the router answer 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/relay", any(relay))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Accept backlog size.
    pub backlog: u32,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            backlog: 128,
        }
    }

    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            backlog: 128,
        }
    }
}

/// Start the API server and run until a shutdown signal arrives.
pub async fn serve(config: ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = config.bind_address().parse().map_err(|_| {
        RelayError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid bind address: {}", config.bind_address()),
        ))
    })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(config.backlog)?;

    tracing::info!("session-relay listening on {}", addr);

    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| RelayError::Io(std::io::Error::other(e.to_string())))?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
