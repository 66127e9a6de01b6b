//! The convergence monitor: records coherence samples, detects threshold
//! crossing, and computes rate/stability/ETA (spec.md §4.H).
//!
//! Modeled directly on `autonomysim_summoner::metrics::PerformanceMonitor`'s
//! ring-buffer-behind-a-lock shape.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

/// Fixed ring buffer capacity; old samples are discarded on overflow.
const CAPACITY: usize = 1000;

/// One recorded coherence measurement.
#[derive(Debug, Clone, Copy)]
pub struct CoherenceSample {
    pub timestamp: Instant,
    pub value: f64,
}

/// Snapshot statistics, as returned by [`ConvergenceMonitor::statistics`].
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
    pub is_converged: bool,
    #[serde(skip)]
    pub converged_at: Option<Duration>,
    pub rate: f64,
    pub stability: f64,
    #[serde(skip)]
    pub predicted_eta: Option<Duration>,
}

struct Inner {
    samples: VecDeque<CoherenceSample>,
    converged_at: Option<Instant>,
}

/// Tracks coherence history for one swarm run.
pub struct ConvergenceMonitor {
    threshold: f64,
    nominal_sample_period: Duration,
    start_time: RwLock<Instant>,
    inner: RwLock<Inner>,
}

impl ConvergenceMonitor {
    /// `nominal_sample_period` feeds `predict_convergence_time`'s
    /// samples-to-duration conversion; spec.md's default is 100ms.
    pub fn new(threshold: f64, nominal_sample_period: Duration) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            nominal_sample_period,
            start_time: RwLock::new(Instant::now()),
            inner: RwLock::new(Inner {
                samples: VecDeque::with_capacity(CAPACITY),
                converged_at: None,
            }),
        }
    }

    /// Append a sample, update the convergence-crossed timestamp.
    ///
    /// Equal to threshold counts as converged; a later sample strictly below
    /// the threshold clears the crossing.
    pub fn record(&self, r: f64) {
        let now = Instant::now();
        let mut inner = self.inner.write();

        inner.samples.push_back(CoherenceSample { timestamp: now, value: r });
        if inner.samples.len() > CAPACITY {
            inner.samples.pop_front();
        }

        if r >= self.threshold {
            if inner.converged_at.is_none() {
                inner.converged_at = Some(now);
            }
        } else {
            inner.converged_at = None;
        }
    }

    /// `true` when the most recent sample is `>= threshold`.
    pub fn is_converged(&self) -> bool {
        self.inner.read().converged_at.is_some()
    }

    /// Most recent sample value; `0.0` with an empty history.
    pub fn current_coherence(&self) -> f64 {
        self.inner.read().samples.back().map(|s| s.value).unwrap_or(0.0)
    }

    /// Duration from `start_time` to the convergence crossing; zero if never
    /// crossed.
    pub fn convergence_time(&self) -> Duration {
        let inner = self.inner.read();
        match inner.converged_at {
            Some(crossed) => crossed.saturating_duration_since(*self.start_time.read()),
            None => Duration::ZERO,
        }
    }

    /// Linear-regression slope of R, in R-per-sample, over the last
    /// `min(10, |history|)` samples.
    pub fn convergence_rate(&self) -> f64 {
        let inner = self.inner.read();
        linear_slope(tail_values(&inner.samples, 10))
    }

    /// `exp(-sigma * 10)` where sigma is the standard deviation of the last
    /// `min(20, |history|)` samples; `1.0` with fewer than 2 samples.
    pub fn stability(&self) -> f64 {
        let inner = self.inner.read();
        let window = tail_values(&inner.samples, 20);
        if window.len() < 2 {
            return 1.0;
        }
        (-std_dev(&window) * 10.0).exp()
    }

    /// `0` if already converged or the rate is non-positive; otherwise
    /// `(threshold - R_last) / rate * nominal_sample_period`.
    pub fn predict_convergence_time(&self) -> Duration {
        if self.is_converged() {
            return Duration::ZERO;
        }
        let rate = self.convergence_rate();
        if rate <= 0.0 {
            return Duration::ZERO;
        }
        let samples_needed = (self.threshold - self.current_coherence()) / rate;
        if !samples_needed.is_finite() || samples_needed <= 0.0 {
            return Duration::ZERO;
        }
        self.nominal_sample_period.mul_f64(samples_needed)
    }

    /// Full statistics snapshot.
    pub fn statistics(&self) -> MonitorStatistics {
        let inner = self.inner.read();
        let values: Vec<f64> = inner.samples.iter().map(|s| s.value).collect();
        let mean = mean(&values);
        let std_dev = std_dev(&values);
        let (min, max) = min_max(&values);
        let is_converged = inner.converged_at.is_some();
        let converged_at = inner
            .converged_at
            .map(|c| c.saturating_duration_since(*self.start_time.read()));

        drop(inner);

        let rate = self.convergence_rate();
        let stability = self.stability();
        let predicted_eta = if is_converged || rate <= 0.0 {
            None
        } else {
            Some(self.predict_convergence_time())
        };

        MonitorStatistics {
            mean,
            std_dev,
            min,
            max,
            sample_count: values.len(),
            is_converged,
            converged_at,
            rate,
            stability,
            predicted_eta,
        }
    }

    /// Snapshot copy of all retained samples.
    pub fn history(&self) -> Vec<CoherenceSample> {
        self.inner.read().samples.iter().copied().collect()
    }

    /// Clear history, clear the convergence crossing, restart `start_time`.
    /// Idempotent: a second call is a no-op on an already-empty monitor.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.samples.clear();
        inner.converged_at = None;
        *self.start_time.write() = Instant::now();
    }
}

fn tail_values(samples: &VecDeque<CoherenceSample>, n: usize) -> Vec<f64> {
    let len = samples.len();
    let start = len.saturating_sub(n);
    samples.iter().skip(start).map(|s| s.value).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

/// Ordinary least squares slope of `values` against their index.
fn linear_slope(values: Vec<f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(&values);

    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..n {
        num += (xs[i] - x_mean) * (values[i] - y_mean);
        den += (xs[i] - x_mean).powi(2);
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
