//! Exporter configuration file.
//!
//! An optional TOML file supplying the sensor table and timeouts:
//!
//! ```toml
//! bind_addr = "0.0.0.0:8080"
//! request_timeout_ms = 15000
//! sensor_timeout_ms = 5000
//!
//! [sensors]
//! "Bedroom" = "192.168.53.1"
//! "Living Room" = "192.168.53.235"
//! ```

use crate::error::{ExporterError, Result};
use crate::sensors::SensorTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Contents of the exporter configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    /// Address the HTTP server binds to
    pub bind_addr: Option<String>,
    /// Deadline for a whole scrape request, in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// Upper bound on each sensor request, in milliseconds
    pub sensor_timeout_ms: Option<u64>,
    /// Sensor display name to address
    #[serde(default)]
    pub sensors: SensorTable,
}

impl ExporterConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExporterError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ExporterError::config_error(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ExporterError::config_error(format!("Failed to parse config: {}", e)))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn sensor_timeout(&self) -> Option<Duration> {
        self.sensor_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = ExporterConfig::parse(
            r#"
            bind_addr = "0.0.0.0:9101"
            request_timeout_ms = 15000
            sensor_timeout_ms = 5000

            [sensors]
            "Bedroom" = "192.168.53.1"
            "Living Room" = "192.168.53.235:80"
            "#,
        )
        .expect("Should parse config");

        assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:9101"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.sensor_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors.get("Living Room"), Some("192.168.53.235:80"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = ExporterConfig::parse("").unwrap();
        assert_eq!(config, ExporterConfig::default());
        assert!(config.sensors.is_empty());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(ExporterConfig::parse("bind_address = \"x\"").is_err());
        assert!(ExporterConfig::parse("[sensors]\nBedroom = 5").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ExporterConfig::load("/nonexistent/awair.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/awair.toml"));
    }
}
