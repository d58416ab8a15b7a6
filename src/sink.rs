use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::errors::SinkError;

/// Receives flattened samples, e.g. a local TSDB appender.
///
/// Methods take `&self` so one sink instance can be shared by several
/// concurrent decodes; implementations own whatever locking that needs.
pub trait Sink {
    fn append(
        &self,
        metric_name: &str,
        labels: &BTreeMap<String, String>,
        timestamp_ms: i64,
        value: f64,
    ) -> Result<(), SinkError>;

    /// Called once at the end of each successful decode.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A flattened sample, exactly as a sink saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub metric_name: String,
    pub labels: BTreeMap<String, String>,
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Collects samples in memory behind a mutex. Useful in tests and small
/// tools; anything serious wants a real TSDB appender instead.
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Mutex<Vec<MetricSample>>,
    flushes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.lock().expect("sample buffer poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().expect("sample buffer poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl Sink for MemorySink {
    fn append(
        &self,
        metric_name: &str,
        labels: &BTreeMap<String, String>,
        timestamp_ms: i64,
        value: f64,
    ) -> Result<(), SinkError> {
        let mut samples = self.samples.lock().map_err(|_| SinkError::new("sample buffer poisoned"))?;
        samples.push(MetricSample {
            metric_name: metric_name.to_string(),
            labels: labels.clone(),
            timestamp_ms,
            value,
        });
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        let labels = BTreeMap::new();
        sink.append("a", &labels, 1, 1.0).unwrap();
        sink.append("b", &labels, 2, 2.0).unwrap();
        sink.flush().unwrap();

        let samples = sink.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].metric_name, "a");
        assert_eq!(samples[1].timestamp_ms, 2);
        assert_eq!(sink.flush_count(), 1);
    }
}
