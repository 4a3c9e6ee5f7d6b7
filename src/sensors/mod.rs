//! Sensor polling: readings, the sensor table, the HTTP client and the
//! per-scrape fan-out across all sensors.

pub mod aggregator;
pub mod client;
pub mod data;
pub mod traits;

// Re-export commonly used items
pub use aggregator::{Aggregator, BatchResult};
pub use client::SensorClient;
pub use data::{Reading, SensorTable};
pub use traits::ReadingSource;
