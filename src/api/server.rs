//! API Server
//!
//! Runs the REST listener for the service with graceful shutdown.

use crate::error::{Error, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: "0.0.0.0:8080".parse().unwrap(),
            request_timeout_secs: 30,
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST server wrapper owning the shutdown channel
pub struct ApiServer {
    config: ApiServerConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown_tx,
        }
    }

    /// Serve `app` until shutdown is triggered
    pub async fn run(&self, app: Router) -> Result<()> {
        let addr = self.config.rest_addr;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("REST API listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

        let app = app.layer(TraceLayer::new_for_http());
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.rest_addr.port(), 8080);
        assert_eq!(config.request_timeout_secs, 30);
    }
}
