//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (tracing, timeout, CN extraction)
//! - Bind server to listener and shut down gracefully

use axum::Router;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::extract::{ConfigurationError, ExtractCnLayer};
use crate::http::forward::{forward_handler, Forwarder, UpstreamError};

/// Errors that prevent the server from being assembled.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    ExtractCn(#[from] ConfigurationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Assemble the middleware chain. Fails without building anything if
    /// the CN filter or the upstream cannot be configured.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let extract_cn = ExtractCnLayer::new(&config.extract_cn)?;
        let forwarder = Forwarder::new(&config.upstream.url)?;

        tracing::info!(
            upstream = %forwarder.authority(),
            dest_header = %extract_cn.destination(),
            "Middleware chain assembled"
        );

        let router = Self::build_router(&config, forwarder, extract_cn);
        Ok(Self { router, config })
    }

    /// Layers run outermost first: trace, timeout, CN extraction, forward.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, forwarder: Forwarder, extract_cn: ExtractCnLayer) -> Router {
        Router::new()
            .fallback(forward_handler)
            .with_state(forwarder)
            .layer(extract_cn)
            .layer(TimeoutLayer::new(Duration::from_secs(config.upstream.timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The assembled router, for embedding in another server.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
