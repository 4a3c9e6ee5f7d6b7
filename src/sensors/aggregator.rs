//! Concurrent fan-out of one scrape across every configured sensor.

use crate::error::{SensorError, SensorFailure};
use crate::sensors::data::{Reading, SensorTable};
use crate::sensors::traits::ReadingSource;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Readings gathered by one scrape of the sensor table.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Readings from the sensors that answered successfully
    pub readings: HashMap<String, Reading>,
    /// Names of the sensors that answered, in completion order
    pub responded: Vec<String>,
    /// The reported failure, if any sensor failed
    pub error: Option<SensorFailure>,
    failed: Vec<String>,
}

impl BatchResult {
    /// Build a successful batch directly from readings.
    pub fn from_readings<I, N>(readings: I) -> Self
    where
        I: IntoIterator<Item = (N, Reading)>,
        N: Into<String>,
    {
        let mut batch = Self::default();
        for (name, reading) in readings {
            let name = name.into();
            batch.responded.push(name.clone());
            batch.readings.insert(name, reading);
        }
        batch
    }

    /// Whether every sensor in `table` either produced a reading or failed.
    pub fn is_complete(&self, table: &SensorTable) -> bool {
        table
            .iter()
            .all(|(name, _)| self.readings.contains_key(name) || self.failed.iter().any(|f| f == name))
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Names of the sensors that failed, sorted.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Sensor names with readings, in ascending byte order.
    pub fn sorted_sensors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.readings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Queries every sensor of a table concurrently for each scrape.
pub struct Aggregator<S> {
    source: Arc<S>,
    table: Arc<SensorTable>,
}

impl<S> Clone for Aggregator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            table: Arc::clone(&self.table),
        }
    }
}

impl<S: ReadingSource> Aggregator<S> {
    pub fn new(source: S, table: SensorTable) -> Self {
        Self {
            source: Arc::new(source),
            table: Arc::new(table),
        }
    }

    /// The sensor table this aggregator scrapes.
    pub fn table(&self) -> &SensorTable {
        &self.table
    }

    /// Fetch every sensor concurrently and wait for all of them.
    ///
    /// Never returns early: each sensor either contributes a reading or a
    /// failure. When several sensors fail, the failure of the sensor whose
    /// name sorts first is reported. Dropping the returned future aborts
    /// every in-flight fetch.
    pub async fn collect(&self) -> BatchResult {
        let sensor_count = self.table.len();
        let results = Arc::new(Mutex::new(BatchResult::default()));
        let (errors_tx, mut errors_rx) = mpsc::channel::<SensorFailure>(sensor_count.max(1));

        let mut tasks = JoinSet::new();
        for (name, address) in self.table.iter() {
            let source = Arc::clone(&self.source);
            let results = Arc::clone(&results);
            let errors_tx = errors_tx.clone();
            let name = name.to_string();
            let address = address.to_string();

            tasks.spawn(async move {
                match source.fetch(&address).await {
                    Ok(reading) => {
                        let mut batch = results.lock().unwrap_or_else(PoisonError::into_inner);
                        batch.responded.push(name.clone());
                        batch.readings.insert(name, reading);
                    }
                    Err(error) => {
                        // Capacity equals the sensor count, so this never waits.
                        let _ = errors_tx.send(SensorFailure::new(name, error)).await;
                    }
                }
            });
        }
        drop(errors_tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Sensor fetch task failed: {}", e);
            }
        }

        let mut batch = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));

        let mut failures = Vec::with_capacity(sensor_count);
        while let Ok(failure) = errors_rx.try_recv() {
            failures.push(failure);
        }

        // A task that panicked reported nothing; account for it so the batch
        // stays complete.
        let reported: HashSet<&str> = failures.iter().map(|f| f.sensor.as_str()).collect();
        let missing: Vec<String> = self
            .table
            .iter()
            .filter(|(name, _)| !batch.readings.contains_key(*name) && !reported.contains(name))
            .map(|(name, _)| name.to_string())
            .collect();
        for name in missing {
            failures.push(SensorFailure::new(
                name,
                SensorError::Aborted("task ended without a result".to_string()),
            ));
        }

        failures.sort_by(|a, b| a.sensor.cmp(&b.sensor));
        batch.failed = failures.iter().map(|f| f.sensor.clone()).collect();
        batch.error = failures.into_iter().next();

        debug!(
            "Scraped {} sensors: {} ok, {} failed",
            sensor_count,
            batch.readings.len(),
            batch.failed.len()
        );

        batch
    }

    /// Scrape every sensor, failing the whole batch if any sensor failed.
    pub async fn aggregate(&self) -> Result<BatchResult, SensorFailure> {
        let mut batch = self.collect().await;
        match batch.error.take() {
            Some(failure) => Err(failure),
            None => Ok(batch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    /// Serves readings from a fixed address → score table; any other address
    /// fails with a 500 status.
    struct FakeSource {
        scores: HashMap<&'static str, f64>,
        barrier: Option<Barrier>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn new(scores: &[(&'static str, f64)]) -> Self {
            Self {
                scores: scores.iter().copied().collect(),
                barrier: None,
                delay: None,
                in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl ReadingSource for FakeSource {
        async fn fetch(&self, address: &str) -> Result<Reading, SensorError> {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if address == "panic" {
                panic!("sensor exploded");
            }
            match self.scores.get(address) {
                Some(score) => Ok(Reading {
                    score: *score,
                    ..Default::default()
                }),
                None => Err(SensorError::RemoteStatus {
                    url: address.to_string(),
                    status: 500,
                }),
            }
        }
    }

    fn table(entries: &[(&str, &str)]) -> SensorTable {
        entries.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_all_sensors_succeed() {
        let source = FakeSource::new(&[("a", 80.0), ("b", 90.0), ("c", 70.0)]);
        let table = table(&[("A", "a"), ("B", "b"), ("C", "c")]);
        let aggregator = Aggregator::new(source, table.clone());

        let batch = aggregator.aggregate().await.expect("All sensors should succeed");
        assert_eq!(batch.readings.len(), 3);
        assert_eq!(batch.responded.len(), 3);
        assert_eq!(batch.readings["A"].score, 80.0);
        assert_eq!(batch.readings["B"].score, 90.0);
        assert!(batch.is_complete(&table));
        assert_eq!(batch.sorted_sensors(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_single_failure_fails_batch() {
        let source = FakeSource::new(&[("a", 80.0)]);
        let table = table(&[("A", "a"), ("B", "unreachable")]);
        let aggregator = Aggregator::new(source, table.clone());

        let batch = aggregator.collect().await;
        assert!(!batch.is_success());
        assert!(batch.is_complete(&table));
        assert_eq!(batch.failed(), ["B".to_string()]);

        let failure = aggregator.aggregate().await.unwrap_err();
        assert_eq!(failure.sensor, "B");
        assert_eq!(failure.error.status(), Some(500));
    }

    #[tokio::test]
    async fn test_multiple_failures_report_first_sensor_by_name() {
        let source = FakeSource::new(&[("ok", 1.0)]);
        let table = table(&[("Zulu", "z"), ("Mike", "m"), ("Alpha", "a"), ("Bravo", "ok")]);
        let aggregator = Aggregator::new(source, table.clone());

        for _ in 0..20 {
            let batch = aggregator.collect().await;
            assert!(batch.is_complete(&table));
            assert_eq!(batch.failed(), ["Alpha", "Mike", "Zulu"]);
            assert_eq!(batch.error.as_ref().map(|f| f.sensor.as_str()), Some("Alpha"));
        }
    }

    #[tokio::test]
    async fn test_fetches_run_concurrently() {
        // Every fetch waits for all the others; a sequential fan-out deadlocks.
        let mut source = FakeSource::new(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);
        source.barrier = Some(Barrier::new(4));
        let table = table(&[("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")]);
        let aggregator = Aggregator::new(source, table);

        let batch = tokio::time::timeout(Duration::from_secs(5), aggregator.aggregate())
            .await
            .expect("Fan-out should not serialize fetches")
            .expect("All sensors should succeed");
        assert_eq!(batch.readings.len(), 4);
    }

    #[tokio::test]
    async fn test_panicking_fetch_is_reported() {
        let source = FakeSource::new(&[("a", 1.0)]);
        let table = table(&[("A", "a"), ("Broken", "panic")]);
        let aggregator = Aggregator::new(source, table.clone());

        let batch = aggregator.collect().await;
        assert!(batch.is_complete(&table));
        let failure = batch.error.expect("Panicked sensor should fail the batch");
        assert_eq!(failure.sensor, "Broken");
        assert!(matches!(failure.error, SensorError::Aborted(_)));
    }

    #[tokio::test]
    async fn test_empty_table() {
        let aggregator = Aggregator::new(FakeSource::new(&[]), SensorTable::new());
        let batch = aggregator.aggregate().await.unwrap();
        assert!(batch.readings.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_scrape_aborts_fetches() {
        let mut source = FakeSource::new(&[("a", 1.0)]);
        source.delay = Some(Duration::from_secs(30));
        let aggregator = Aggregator::new(source, table(&[("A", "a")]));

        let result = tokio::time::timeout(Duration::from_millis(50), aggregator.aggregate()).await;
        assert!(result.is_err());
        assert_eq!(aggregator.source.in_flight.load(Ordering::SeqCst), 1);
        // The aborted task releases its handle on the source once cancelled.
        for _ in 0..100 {
            if Arc::strong_count(&aggregator.source) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&aggregator.source), 1);
    }

    #[test]
    fn test_batch_from_readings() {
        let batch = BatchResult::from_readings([("B", Reading::default()), ("A", Reading::default())]);
        assert!(batch.is_success());
        assert_eq!(batch.sorted_sensors(), vec!["A", "B"]);
        assert!(batch.is_complete(&table(&[("A", "x"), ("B", "y")])));
        assert!(!batch.is_complete(&table(&[("C", "z")])));
    }
}
