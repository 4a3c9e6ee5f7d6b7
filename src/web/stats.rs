//! Process-wide request statistics served on the diagnostics route.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Number of elapsed-time samples kept for the summary statistics.
pub const ELAPSED_WINDOW: usize = 1024;

/// Counters and timings shared by every request for the process lifetime.
#[derive(Debug, Default)]
pub struct ServerStats {
    sensor_count: AtomicU64,
    request_count: AtomicU64,
    error_count: AtomicU64,
    deadline_exceeded_count: AtomicU64,
    canceled_count: AtomicU64,
    elapsed_ms: Mutex<VecDeque<f64>>,
}

/// Point-in-time copy of [`ServerStats`], keyed the way `/debug/vars` reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(rename = "awair.sensor.count")]
    pub sensor_count: u64,
    #[serde(rename = "http.request.count")]
    pub request_count: u64,
    #[serde(rename = "http.request.error.count")]
    pub error_count: u64,
    #[serde(rename = "http.request.deadline_exceeded.count")]
    pub deadline_exceeded_count: u64,
    #[serde(rename = "http.request.canceled.count")]
    pub canceled_count: u64,
    #[serde(rename = "http.request.elapsed.last")]
    pub elapsed_last_ms: f64,
    #[serde(rename = "http.request.elapsed.avg")]
    pub elapsed_avg_ms: f64,
    #[serde(rename = "http.request.elapsed.p95")]
    pub elapsed_p95_ms: f64,
    #[serde(rename = "http.request.elapsed.min")]
    pub elapsed_min_ms: f64,
    #[serde(rename = "http.request.elapsed.max")]
    pub elapsed_max_ms: f64,
}

impl ServerStats {
    pub fn new(sensor_count: usize) -> Self {
        let stats = Self::default();
        stats.sensor_count.store(sensor_count as u64, Ordering::Relaxed);
        stats
    }

    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadline_exceeded(&self) {
        self.deadline_exceeded_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_canceled(&self) {
        self.canceled_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_elapsed(&self, elapsed: Duration) {
        let mut samples = self.elapsed_ms.lock().unwrap_or_else(PoisonError::into_inner);
        if samples.len() == ELAPSED_WINDOW {
            samples.pop_front();
        }
        samples.push_back(elapsed.as_nanos() as f64 / 1_000_000.0);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn deadline_exceeded_count(&self) -> u64 {
        self.deadline_exceeded_count.load(Ordering::Relaxed)
    }

    pub fn canceled_count(&self) -> u64 {
        self.canceled_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot {
            sensor_count: self.sensor_count.load(Ordering::Relaxed),
            request_count: self.request_count(),
            error_count: self.error_count(),
            deadline_exceeded_count: self.deadline_exceeded_count(),
            canceled_count: self.canceled_count(),
            ..Default::default()
        };

        let samples = self.elapsed_ms.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(&last) = samples.back() else {
            return snapshot;
        };

        let mut sorted: Vec<f64> = samples.iter().copied().collect();
        drop(samples);
        sorted.sort_by(f64::total_cmp);

        // Nearest-rank percentile.
        let rank = ((sorted.len() as f64) * 0.95).ceil() as usize;
        snapshot.elapsed_last_ms = last;
        snapshot.elapsed_avg_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        snapshot.elapsed_p95_ms = sorted[rank.clamp(1, sorted.len()) - 1];
        snapshot.elapsed_min_ms = sorted[0];
        snapshot.elapsed_max_ms = sorted[sorted.len() - 1];
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = ServerStats::new(2);
        stats.record_request();
        stats.record_request();
        stats.record_error();
        stats.record_canceled();
        stats.record_deadline_exceeded();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sensor_count, 2);
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.canceled_count, 1);
        assert_eq!(snapshot.deadline_exceeded_count, 1);
        assert_eq!(snapshot.elapsed_max_ms, 0.0);
    }

    #[test]
    fn test_elapsed_summary() {
        let stats = ServerStats::new(0);
        for ms in (1..=100).rev() {
            stats.record_elapsed(Duration::from_millis(ms));
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.elapsed_last_ms, 1.0);
        assert_eq!(snapshot.elapsed_min_ms, 1.0);
        assert_eq!(snapshot.elapsed_max_ms, 100.0);
        assert_eq!(snapshot.elapsed_p95_ms, 95.0);
        assert!((snapshot.elapsed_avg_ms - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_window_is_bounded() {
        let stats = ServerStats::new(0);
        stats.record_elapsed(Duration::from_secs(60));
        for _ in 0..ELAPSED_WINDOW {
            stats.record_elapsed(Duration::from_millis(2));
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.elapsed_max_ms, 2.0);
        assert_eq!(snapshot.elapsed_min_ms, 2.0);
    }

    #[test]
    fn test_snapshot_uses_expvar_names() {
        let stats = ServerStats::new(3);
        stats.record_request();
        let json = serde_json::to_value(stats.snapshot()).unwrap();

        assert_eq!(json["awair.sensor.count"], 3);
        assert_eq!(json["http.request.count"], 1);
        assert!(json.get("http.request.elapsed.p95").is_some());
    }
}
