//! Rendering of scraped readings in the Prometheus text format, and of the
//! sensor table as a JSON directory.

use crate::sensors::{BatchResult, Reading, SensorTable};
use serde_json::{Map, Value};
use std::fmt::Write;

/// Metric name and accessor for every value exported per sensor, in output order.
pub const METRICS: [(&str, fn(&Reading) -> f64); 11] = [
    ("awair_score", |r| r.score),
    ("awair_dew_point", |r| r.dew_point),
    ("awair_temp", |r| r.temp),
    ("awair_humid", |r| r.humid),
    ("awair_co2", |r| r.co2),
    ("awair_voc", |r| r.voc),
    ("awair_voc_baseline", |r| r.voc_baseline),
    ("awair_voc_h2_raw", |r| r.voc_h2_raw),
    ("awair_voc_ethanol_raw", |r| r.voc_ethanol_raw),
    ("awair_pm25", |r| r.pm25),
    ("awair_pm10_est", |r| r.pm10_est),
];

/// Render every reading in the batch as Prometheus text.
///
/// Sensors are emitted in ascending byte order of their names, each as a
/// block of eleven lines, so repeated scrapes diff cleanly.
pub fn render_prometheus(batch: &BatchResult) -> String {
    let mut out = String::with_capacity(batch.readings.len() * METRICS.len() * 48);

    for sensor in batch.sorted_sensors() {
        let Some(reading) = batch.readings.get(sensor) else {
            continue;
        };
        let label = escape_label_value(sensor);
        for (name, value) in METRICS {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}{{sensor=\"{}\"}} {:.6}", name, label, value(reading));
        }
    }

    out
}

/// The sensor table as a JSON object of name to address.
pub fn render_directory(table: &SensorTable) -> Value {
    let directory: Map<String, Value> = table
        .iter()
        .map(|(name, address)| (name.to_string(), Value::String(address.to_string())))
        .collect();
    Value::Object(directory)
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
