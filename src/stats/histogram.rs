//! Export request latency histogram using HdrHistogram

use hdrhistogram::Histogram;
use std::time::Duration;

/// Highest trackable latency: one minute, in microseconds
const MAX_LATENCY_US: u64 = 60_000_000;

/// Latency histogram wrapper
///
/// Tracks export request latencies from 1us to 1 minute with 3 significant
/// digits of precision. Values outside the range are clamped.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_LATENCY_US, 3)
            .expect("Failed to create histogram with valid bounds");

        Self { histogram }
    }

    /// Record a latency sample
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let micros = latency.as_micros() as u64;
        let value = micros.clamp(1, MAX_LATENCY_US);
        let _ = self.histogram.record(value);
    }

    /// Latency at the given percentile (0.0 - 100.0), None if empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        let value = self.histogram.value_at_percentile(percentile);
        Some(Duration::from_micros(value))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.mean() as u64))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let hist = LatencyHistogram::new();
        assert!(hist.is_empty());
        assert!(hist.percentile(50.0).is_none());
        assert!(hist.min().is_none());
        assert!(hist.mean().is_none());
    }

    #[test]
    fn test_percentile() {
        let mut hist = LatencyHistogram::new();
        for i in 1..=100 {
            hist.record(Duration::from_millis(i));
        }

        let p50 = hist.percentile(50.0).unwrap();
        let p99 = hist.percentile(99.0).unwrap();
        assert!(p50.as_millis() >= 49 && p50.as_millis() <= 51);
        assert!(p99.as_millis() >= 98 && p99.as_millis() <= 100);
        assert_eq!(hist.len(), 100);
    }

    #[test]
    fn test_clamps_out_of_range() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::ZERO);
        hist.record(Duration::from_secs(3600));

        assert_eq!(hist.len(), 2);
        assert_eq!(hist.min().unwrap(), Duration::from_micros(1));
        assert!(hist.max().unwrap() >= Duration::from_secs(59));
    }
}
