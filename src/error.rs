//! Error handling for the Awair exporter crate.

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The main error type for exporter setup and serving.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// A scrape of the sensor table failed
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorFailure),
}

impl ExporterError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }
}

/// Failure of a single fetch against one sensor.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// The sensor could not be reached, or the connection failed mid-response.
    #[error("transport error requesting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The sensor answered outside of the 2xx range.
    #[error("non-2xx status {status} returned from {url}")]
    RemoteStatus { url: String, status: u16 },

    /// The response body was not a valid reading.
    #[error("invalid reading from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The fetch task ended without reporting a result.
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

impl SensorError {
    /// HTTP status returned by the sensor, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A [`SensorError`] tagged with the name of the sensor that produced it.
#[derive(Debug, thiserror::Error)]
#[error("sensor {sensor:?}: {error}")]
pub struct SensorFailure {
    pub sensor: String,
    #[source]
    pub error: SensorError,
}

impl SensorFailure {
    pub fn new(sensor: impl Into<String>, error: SensorError) -> Self {
        Self {
            sensor: sensor.into(),
            error,
        }
    }
}
