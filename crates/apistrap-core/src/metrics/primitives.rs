//! Counter, gauge and histogram accumulators.
//!
//! Every primitive owns a `parking_lot::Mutex` around its state. Critical
//! sections are a single scalar update, and reads take the same lock so a
//! snapshot never observes a half-applied observation (histogram `count` and
//! the `+Inf` bucket always agree).

use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{ApiStrapError, Result};

/// Default latency buckets in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Monotonically non-decreasing counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: Mutex<u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Increment by an arbitrary amount.
    pub fn increment_by(&self, n: u64) {
        let mut v = self.value.lock();
        *v = v.saturating_add(n);
    }

    pub fn value(&self) -> u64 {
        *self.value.lock()
    }
}

/// Arbitrarily settable floating point value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: Mutex<f64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, v: f64) {
        *self.value.lock() = v;
    }

    pub fn increment(&self, by: f64) {
        *self.value.lock() += by;
    }

    pub fn decrement(&self, by: f64) {
        *self.value.lock() -= by;
    }

    pub fn value(&self) -> f64 {
        *self.value.lock()
    }
}

#[derive(Debug)]
struct HistogramState {
    /// Observations whose smallest enclosing boundary is `bounds[i]`.
    tallies: Vec<u64>,
    count: u64,
    sum: f64,
}

/// Point-in-time view of a histogram, read under a single lock.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(boundary, cumulative count)` in ascending boundary order.
    pub buckets: Vec<(f64, u64)>,
    pub count: u64,
    pub sum: f64,
}

/// Distribution with fixed bucket boundaries.
///
/// Boundaries are closed upper bounds (`v <= le`) and never change after
/// construction. Values above the last boundary only show up in `count`
/// (the `+Inf` bucket).
#[derive(Debug)]
pub struct Histogram {
    bounds: Box<[f64]>,
    state: Mutex<HistogramState>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::from_validated(DEFAULT_BUCKETS.into())
    }
}

impl Histogram {
    /// Histogram with [`DEFAULT_BUCKETS`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Histogram with custom boundaries (non-empty, finite, strictly ascending).
    pub fn with_buckets(bounds: &[f64]) -> Result<Self> {
        validate_buckets(bounds)?;
        Ok(Self::from_validated(bounds.into()))
    }

    pub(crate) fn from_validated(bounds: Box<[f64]>) -> Self {
        let tallies = vec![0; bounds.len()];
        Self {
            bounds,
            state: Mutex::new(HistogramState { tallies, count: 0, sum: 0.0 }),
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one observation. No value is rejected.
    pub fn observe(&self, v: f64) {
        // First boundary that is not strictly below `v`.
        let idx = self.bounds.partition_point(|b| *b < v);
        let mut s = self.state.lock();
        s.count += 1;
        s.sum += v;
        // NaN compares false everywhere and lands only in +Inf.
        if let (Some(bound), Some(tally)) = (self.bounds.get(idx), s.tallies.get_mut(idx)) {
            if v <= *bound {
                *tally += 1;
            }
        }
    }

    /// Record a duration in seconds.
    pub fn observe_duration(&self, d: Duration) {
        self.observe(d.as_secs_f64());
    }

    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    pub fn sum(&self) -> f64 {
        self.state.lock().sum
    }

    /// Cumulative counts per boundary, ascending.
    pub fn cumulative_buckets(&self) -> Vec<(f64, u64)> {
        self.snapshot().buckets
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let s = self.state.lock();
        let mut running = 0u64;
        let buckets = self
            .bounds
            .iter()
            .zip(s.tallies.iter())
            .map(|(le, n)| {
                running += n;
                (*le, running)
            })
            .collect();
        HistogramSnapshot { buckets, count: s.count, sum: s.sum }
    }
}

/// Check a bucket layout before it is fixed into a histogram.
pub fn validate_buckets(bounds: &[f64]) -> Result<()> {
    if bounds.is_empty() {
        return Err(ApiStrapError::InvalidMetric("histogram buckets must not be empty".into()));
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(ApiStrapError::InvalidMetric(format!(
            "histogram bucket must be finite, got {b}"
        )));
    }
    if bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ApiStrapError::InvalidMetric(
            "histogram buckets must be strictly ascending".into(),
        ));
    }
    Ok(())
}
