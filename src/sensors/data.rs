//! Data structures for sensor readings and the sensor table.

use crate::error::{ExporterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Decode `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// The latest air-data reading reported by a single Awair sensor.
///
/// Field names match the sensor's `/air-data/latest` JSON payload. Unknown
/// fields are ignored; missing and `null` ones decode as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reading {
    /// When the sensor took this reading
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: DateTime<Utc>,
    /// Awair air-quality score (0 to 100)
    #[serde(deserialize_with = "null_as_default")]
    pub score: f64,
    /// Dew point in degrees celsius
    #[serde(deserialize_with = "null_as_default")]
    pub dew_point: f64,
    /// Temperature in degrees celsius
    #[serde(deserialize_with = "null_as_default")]
    pub temp: f64,
    /// Relative humidity (0.0 to 100.0)
    #[serde(deserialize_with = "null_as_default")]
    pub humid: f64,
    /// Carbon dioxide in ppm
    #[serde(deserialize_with = "null_as_default")]
    pub co2: f64,
    /// Total volatile organic compounds in ppb
    #[serde(deserialize_with = "null_as_default")]
    pub voc: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub voc_baseline: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub voc_h2_raw: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub voc_ethanol_raw: f64,
    /// Fine particulate matter (PM2.5) in µg/m³
    #[serde(deserialize_with = "null_as_default")]
    pub pm25: f64,
    /// Estimated PM10 in µg/m³
    #[serde(deserialize_with = "null_as_default")]
    pub pm10_est: f64,
}

impl Reading {
    /// Decode the first JSON value in a sensor response body. Anything after
    /// that value is ignored.
    pub fn from_json(body: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_slice(body);
        Self::deserialize(&mut deserializer)
    }
}

/// Mapping from sensor display name to its network address (`host[:port]`).
///
/// Immutable once the exporter starts; every scrape queries every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorTable(BTreeMap<String, String>);

impl SensorTable {
    /// Create an empty sensor table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sensor.
    pub fn with_sensor(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.insert(name, address);
        self
    }

    /// Add or replace a sensor, returning the previous address if any.
    pub fn insert(&mut self, name: impl Into<String>, address: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), address.into())
    }

    /// Look up the address of a sensor.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, address)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, address)| (name.as_str(), address.as_str()))
    }

    /// Merge another table into this one; entries in `other` win.
    pub fn merge(&mut self, other: SensorTable) {
        self.0.extend(other.0);
    }

    /// Parse a `NAME=ADDRESS` command-line entry.
    pub fn parse_entry(entry: &str) -> Result<(String, String)> {
        let (name, address) = entry.split_once('=').ok_or_else(|| {
            ExporterError::config_error(format!(
                "Invalid sensor entry {:?}: expected NAME=ADDRESS",
                entry
            ))
        })?;

        let name = name.trim();
        let address = address.trim();
        if name.is_empty() || address.is_empty() {
            return Err(ExporterError::config_error(format!(
                "Invalid sensor entry {:?}: name and address must not be empty",
                entry
            )));
        }

        Ok((name.to_string(), address.to_string()))
    }

    /// The two living-space sensors on the home network. These may change
    /// based on DHCP settings.
    pub fn home_defaults() -> Self {
        Self::new()
            .with_sensor("Bedroom", "192.168.53.1")
            .with_sensor("Living Room", "192.168.53.235")
    }
}

impl<N: Into<String>, A: Into<String>> FromIterator<(N, A)> for SensorTable {
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, address)| (name.into(), address.into()))
                .collect(),
        )
    }
}
