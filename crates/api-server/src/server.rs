//! API server — HTTP router plus the Prometheus metrics exporter.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use orbit_core::config::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Main API server for the privacy core.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server. Blocks until shutdown.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = Router::new()
            // Data-subject requests
            .route(
                "/api/v1/privacy/requests",
                post(rest::create_request),
            )
            .route("/api/v1/privacy/requests/:id", get(rest::get_request))
            .route(
                "/api/v1/privacy/requests/:id/process",
                post(rest::advance_request),
            )
            .route(
                "/api/v1/privacy/subjects/:subject_id/requests",
                get(rest::list_subject_requests),
            )
            // Exports
            .route(
                "/api/v1/privacy/subjects/:subject_id/export",
                get(rest::serve_export),
            )
            // Deletion jobs
            .route("/api/v1/privacy/jobs/:id", get(rest::get_job))
            .route("/api/v1/privacy/jobs/:id/process", post(rest::process_job))
            .route("/api/v1/privacy/jobs/:id/requeue", post(rest::requeue_job))
            // Access checks
            .route("/api/v1/access/check", post(rest::access_check))
            // Audit log
            .route("/api/v1/audit-log", get(rest::audit_log))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
