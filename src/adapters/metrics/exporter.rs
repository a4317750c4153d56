//! Metrics Exporter - HTTP Scrape Endpoint
//!
//! Serves the text exposition of a `prometheus::Registry` on `/metrics`
//! and a liveness probe on `/live` via axum 0.7.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

/// Scrape endpoint over a registry that bound metric groups register into.
#[derive(Clone)]
pub struct MetricsExporter {
    registry: Registry,
}

impl MetricsExporter {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode every gathered family in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metric families")?;
        String::from_utf8(buffer).context("Metric exposition is not UTF-8")
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/metrics", get(Self::metrics))
            .route("/live", get(Self::liveness))
            .with_state(self)
    }

    /// Serve until `shutdown_rx` fires.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {bind_address}"))?;
        info!(address = %bind_address, "Metrics exporter started");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("Metrics exporter stopped");
        Ok(())
    }

    async fn metrics(State(exporter): State<Arc<Self>>) -> impl IntoResponse {
        match exporter.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                body,
            ),
            Err(e) => {
                error!(error = %e, "Failed to render metrics");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "text/plain")],
                    e.to_string(),
                )
            }
        }
    }

    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;

    fn exporter_with_counter() -> Arc<MetricsExporter> {
        let registry = Registry::new();
        let counter = prometheus::IntCounter::new("scrapes_total", "Scrapes").unwrap();
        counter.inc();
        registry.register(Box::new(counter)).unwrap();
        Arc::new(MetricsExporter::new(registry))
    }

    #[test]
    fn test_render_text_format() {
        let body = exporter_with_counter().render().unwrap();
        assert!(body.contains("# HELP scrapes_total Scrapes"));
        assert!(body.contains("scrapes_total 1"));
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let response: Response = MetricsExporter::metrics(State(exporter_with_counter()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            prometheus::TEXT_FORMAT
        );
    }

    #[tokio::test]
    async fn test_liveness_handler() {
        let response = MetricsExporter::liveness().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
