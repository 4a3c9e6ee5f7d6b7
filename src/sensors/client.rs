//! HTTP client for the Awair local air-data API.

use crate::error::{ExporterError, Result, SensorError};
use crate::sensors::data::Reading;
use crate::sensors::traits::ReadingSource;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Path of the latest-reading endpoint on every sensor.
pub const LATEST_READING_PATH: &str = "/air-data/latest";

/// Default upper bound on a single sensor request.
pub const DEFAULT_SENSOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches readings from sensors over plain HTTP.
#[derive(Debug, Clone)]
pub struct SensorClient {
    http: reqwest::Client,
}

impl SensorClient {
    /// Create a client with the default per-request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_SENSOR_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExporterError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// URL of the latest-reading endpoint for a sensor address.
    pub fn reading_url(address: &str) -> String {
        format!("http://{}{}", address, LATEST_READING_PATH)
    }

    async fn get_reading(&self, url: &str) -> std::result::Result<(u16, Reading), SensorError> {
        let response = self.http.get(url).send().await.map_err(|source| SensorError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(SensorError::RemoteStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| SensorError::Transport {
            url: url.to_string(),
            source,
        })?;

        let reading = Reading::from_json(&body).map_err(|source| SensorError::Decode {
            url: url.to_string(),
            source,
        })?;

        Ok((status, reading))
    }
}

impl ReadingSource for SensorClient {
    async fn fetch(&self, address: &str) -> std::result::Result<Reading, SensorError> {
        let url = Self::reading_url(address);
        let started = Instant::now();

        match self.get_reading(&url).await {
            Ok((status, reading)) => {
                info!("GET {} {} {:?}", url, status, started.elapsed());
                Ok(reading)
            }
            Err(e) => {
                let status = e.status().map_or_else(|| "-".to_string(), |s| s.to_string());
                warn!("GET {} {} {:?} {}", url, status, started.elapsed(), e);
                Err(e)
            }
        }
    }
}
