//! HTTP front door of the exporter.
//!
//! Serves the Prometheus scrape routes (`/` and `/prometheus`), the sensor
//! directory (`/sensors`) and process statistics (`/debug/vars`). Every
//! request passes through the instrumentation middleware in [`instrument`].

pub mod config;
pub mod handlers;
pub mod instrument;
pub mod router;
pub mod stats;

// Re-export commonly used items
pub use config::WebConfig;
pub use instrument::format_content_length;
pub use router::create_app;
pub use stats::{ServerStats, StatsSnapshot};

use crate::error::{ExporterError, Result};
use crate::sensors::{Aggregator, ReadingSource, SensorClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// State shared by every request handler.
pub struct AppState<S = SensorClient> {
    pub aggregator: Aggregator<S>,
    pub stats: Arc<ServerStats>,
    pub request_timeout: Option<Duration>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
            stats: Arc::clone(&self.stats),
            request_timeout: self.request_timeout,
        }
    }
}

impl<S: ReadingSource> AppState<S> {
    pub fn new(aggregator: Aggregator<S>, config: &WebConfig) -> Self {
        let stats = Arc::new(ServerStats::new(aggregator.table().len()));
        Self {
            aggregator,
            stats,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Start the web server and serve until it fails.
pub async fn start_web_server<S: ReadingSource>(
    config: WebConfig,
    aggregator: Aggregator<S>,
) -> Result<()> {
    let state = AppState::new(aggregator, &config);
    let app = create_app(state, config.enable_trace);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| {
            ExporterError::web_server_error(format!(
                "Failed to bind to address {}: {}",
                config.bind_addr, e
            ))
        })?;

    let addr = listener.local_addr()?;
    info!("http server listening on: {}", addr);
    info!("Prometheus endpoint: http://{}/prometheus", addr);
    info!("Sensor directory: http://{}/sensors", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
