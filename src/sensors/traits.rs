//! Traits for fetching sensor readings.

use crate::error::SensorError;
use crate::sensors::data::Reading;
use std::future::Future;

/// Source of the latest reading for a sensor address.
///
/// The aggregator only talks to sensors through this trait, so tests can
/// stand in fakes for the HTTP client. Implementations make a single
/// attempt per call and must be cancel-safe: dropping the returned future
/// abandons the fetch.
pub trait ReadingSource: Send + Sync + 'static {
    /// Fetch the latest reading from the sensor at `address`.
    fn fetch(&self, address: &str) -> impl Future<Output = Result<Reading, SensorError>> + Send;
}
