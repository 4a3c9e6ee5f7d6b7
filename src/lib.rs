//! # Awair Exporter
//!
//! Polls Awair air-quality sensors over their local HTTP API and republishes
//! the latest readings in the Prometheus text exposition format.
//!
//! ## Features
//!
//! - **Concurrent scrapes**: every sensor is queried in parallel per scrape
//! - **Fail-fast batches**: a scrape either reports every sensor or fails
//! - **Deterministic output**: sensors are rendered in sorted order
//! - **Request statistics**: counters and timings at `/debug/vars`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use awair_exporter::{start_web_server, Aggregator, SensorClient, SensorTable, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = SensorTable::new().with_sensor("Office", "192.168.1.20");
//!     let aggregator = Aggregator::new(SensorClient::new()?, table);
//!
//!     start_web_server(WebConfig::new("0.0.0.0:8080"), aggregator).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exposition;
pub mod sensors;
pub mod web;

// Re-export public API
pub use config::ExporterConfig;
pub use error::{ExporterError, Result, SensorError, SensorFailure};
pub use exposition::{render_directory, render_prometheus};
pub use sensors::{Aggregator, BatchResult, Reading, ReadingSource, SensorClient, SensorTable};
pub use web::{create_app, start_web_server, AppState, ServerStats, WebConfig};

/// The default HTTP server bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
