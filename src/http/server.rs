//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the fixture routes
//! - Wire up middleware (request ID, tracing, timeout, metrics)
//! - Serve plaintext or TLS on an already-bound listener
//! - Stop gracefully when the shutdown signal fires

use axum::{middleware, routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, track_requests};
use crate::identity::ServiceIdentity;
use crate::lifecycle::ShutdownSignal;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<ServiceIdentity>,
    pub tls: bool,
}

/// HTTP server for the fixture.
pub struct HttpServer {
    router: Router,
    tls: Option<RustlsConfig>,
    shutdown_grace: Duration,
}

impl HttpServer {
    /// Create a plaintext server for the given identity.
    pub fn new(identity: Arc<ServiceIdentity>, timeouts: &TimeoutConfig) -> Self {
        Self::build(identity, timeouts, None)
    }

    /// Create a server terminating TLS with the given configuration.
    pub fn with_tls(
        identity: Arc<ServiceIdentity>,
        timeouts: &TimeoutConfig,
        tls: RustlsConfig,
    ) -> Self {
        Self::build(identity, timeouts, Some(tls))
    }

    fn build(
        identity: Arc<ServiceIdentity>,
        timeouts: &TimeoutConfig,
        tls: Option<RustlsConfig>,
    ) -> Self {
        let state = AppState {
            identity,
            tls: tls.is_some(),
        };
        let router = Self::build_router(timeouts, state);
        Self {
            router,
            tls,
            shutdown_grace: Duration::from_secs(timeouts.shutdown_grace_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/hello", get(handlers::hello))
            .route("/info", get(handlers::info))
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Whether the server terminates TLS.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Run the server on `listener` until `shutdown` fires.
    ///
    /// Connections still open after the grace period are abandoned.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let listener = listener.into_std()?;
        let app = self.router.into_make_service();

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let grace = self.shutdown_grace;
        let drain = tokio::spawn(async move {
            shutdown.recv().await;
            tracing::info!(grace_secs = grace.as_secs(), "Draining connections");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        let result = match self.tls {
            None => {
                tracing::info!(address = %addr, scheme = "http", "HTTP server starting");
                axum_server::from_tcp(listener).handle(handle).serve(app).await
            }
            Some(tls) => {
                tracing::info!(address = %addr, scheme = "https", "HTTP server starting");
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(app)
                    .await
            }
        };
        drain.abort();
        result?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}
