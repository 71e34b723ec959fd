//! Bounded metric sampling and the consciousness monitor built on top of it.

/// Simulated coherence sources.
pub mod coherence;
/// Periodic consciousness monitor.
pub mod monitor;
/// Fixed-capacity FIFO buffer.
pub mod ring;

use chrono::{DateTime, Utc};
use ring::BoundedBuffer;
use serde::{Deserialize, Serialize};

/// Value returned by [`MetricSampler::latest_average`] when too few samples exist.
pub const DEFAULT_AVERAGE: f64 = 0.5;

/// One timestamped scalar reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// The reading.
    pub value: f64,
}

/// Bounded, insertion-ordered sequence of samples.
#[derive(Debug, Clone)]
pub struct MetricSampler {
    samples: BoundedBuffer<Sample>,
}

impl Default for MetricSampler {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl MetricSampler {
    /// Creates a sampler retaining at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: BoundedBuffer::new(capacity),
        }
    }

    /// Appends a reading stamped with the current time.
    pub fn record(&mut self, value: f64) {
        self.record_at(Utc::now(), value);
    }

    /// Appends a reading with an explicit timestamp.
    pub fn record_at(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.samples.push(Sample { timestamp, value });
    }

    /// Mean of the newest `n` readings, or [`DEFAULT_AVERAGE`] when fewer than `n` exist.
    #[must_use]
    pub fn latest_average(&self, n: usize) -> f64 {
        if n == 0 || self.samples.len() < n {
            return DEFAULT_AVERAGE;
        }
        mean(self.samples.tail(n).map(|sample| sample.value))
    }

    /// Population variance of the newest `n` readings (all of them when fewer exist).
    /// `None` with fewer than two readings.
    #[must_use]
    pub fn latest_variance(&self, n: usize) -> Option<f64> {
        let values: Vec<f64> = self.samples.tail(n).map(|sample| sample.value).collect();
        if values.len() < 2 {
            return None;
        }
        Some(variance(&values))
    }

    /// Newest `n` values, oldest first.
    #[must_use]
    pub fn latest_values(&self, n: usize) -> Vec<f64> {
        self.samples.tail(n).map(|sample| sample.value).collect()
    }

    /// Most recent sample.
    #[must_use]
    pub fn last(&self) -> Option<Sample> {
        self.samples.last().copied()
    }

    /// Copy of every retained sample, oldest first.
    #[must_use]
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.to_vec()
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.samples.capacity()
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values.iter().copied());
    values.iter().map(|value| (value - mu).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_reading() {
        let mut sampler = MetricSampler::new(3);
        for value in [0.1, 0.2, 0.3, 0.4] {
            sampler.record(value);
        }
        let values: Vec<f64> = sampler.samples().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn retains_exactly_capacity_in_insertion_order() {
        for capacity in [1, 2, 7, 32] {
            let mut sampler = MetricSampler::new(capacity);
            let extra = 5;
            for step in 0..capacity + extra {
                sampler.record(step as f64);
            }
            let values: Vec<f64> = sampler.samples().iter().map(|s| s.value).collect();
            let expected: Vec<f64> = (extra..capacity + extra).map(|v| v as f64).collect();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn average_defaults_when_short() {
        let mut sampler = MetricSampler::new(10);
        assert_eq!(sampler.latest_average(1), DEFAULT_AVERAGE);
        assert_eq!(sampler.latest_average(0), DEFAULT_AVERAGE);
        sampler.record(0.9);
        assert_eq!(sampler.latest_average(2), DEFAULT_AVERAGE);
    }

    #[test]
    fn average_uses_newest_readings() {
        let mut sampler = MetricSampler::new(10);
        for value in [0.0, 1.0, 0.5, 0.7] {
            sampler.record(value);
        }
        assert!((sampler.latest_average(2) - 0.6).abs() < 1e-12);
        assert!((sampler.latest_average(4) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn variance_needs_two_readings() {
        let mut sampler = MetricSampler::new(4);
        sampler.record(1.0);
        assert_eq!(sampler.latest_variance(4), None);
        sampler.record(3.0);
        assert_eq!(sampler.latest_variance(4), Some(1.0));
    }

    #[test]
    fn record_at_keeps_timestamps() {
        let mut sampler = MetricSampler::new(2);
        let ts = Utc::now();
        sampler.record_at(ts, 0.25);
        assert_eq!(sampler.last(), Some(Sample { timestamp: ts, value: 0.25 }));
    }
}
