#![allow(clippy::cast_precision_loss)] // Sample counts and durations are reported as f64

//! Advisory performance sampling.
//!
//! Nothing reads these numbers back to make decisions; they only feed the
//! diagnostic report.

use crate::types::MediaKind;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Standard page-experience signals reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebVital {
    /// Largest contentful paint, in milliseconds.
    Lcp,
    /// First input delay, in milliseconds.
    Fid,
    /// Cumulative layout shift, unitless.
    Cls,
}

impl WebVital {
    /// Metric name samples are recorded under.
    #[must_use]
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::Lcp => "lcp",
            Self::Fid => "fid",
            Self::Cls => "cls",
        }
    }
}

/// Aggregate of every sample recorded for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Mean of the samples.
    pub avg: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Number of samples.
    pub count: usize,
}

impl MetricSummary {
    fn of(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let (min, max, sum) = samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        Some(Self {
            avg: sum / samples.len() as f64,
            min,
            max,
            count: samples.len(),
        })
    }
}

/// Collects named numeric samples.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    samples: Mutex<HashMap<String, Vec<f64>>>,
}

impl PerformanceMonitor {
    /// Create an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to `metric`.
    pub fn record(&self, metric: &str, value: f64) {
        self.lock()
            .entry(metric.to_string())
            .or_default()
            .push(value);
    }

    /// Record a duration in milliseconds.
    pub fn record_duration(&self, metric: &str, elapsed: Duration) {
        self.record(metric, elapsed.as_secs_f64() * 1000.0);
    }

    /// Record how long one image or video took to resolve.
    pub fn record_load(&self, kind: MediaKind, elapsed: Duration) {
        self.record_duration(&format!("{}_load_ms", kind.as_str()), elapsed);
    }

    /// Record a web vital reported by the host.
    pub fn record_vital(&self, vital: WebVital, value: f64) {
        self.record(vital.metric_name(), value);
    }

    /// Summary of one metric, if it has samples.
    pub fn metric(&self, metric: &str) -> Option<MetricSummary> {
        self.lock().get(metric).and_then(|s| MetricSummary::of(s))
    }

    /// Summaries of every metric, sorted by name.
    pub fn summary(&self) -> BTreeMap<String, MetricSummary> {
        self.lock()
            .iter()
            .filter_map(|(name, samples)| MetricSummary::of(samples).map(|s| (name.clone(), s)))
            .collect()
    }

    /// Emit the summary through the log.
    pub fn report(&self) {
        let summary = self.summary();
        if summary.is_empty() {
            debug!("No performance samples recorded");
            return;
        }
        for (metric, s) in &summary {
            info!(
                metric = %metric,
                count = s.count,
                "avg {:.2}, min {:.2}, max {:.2}",
                s.avg,
                s.min,
                s.max
            );
        }
    }

    /// Drop every sample.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Report every `interval` until `shutdown` fires.
    pub fn spawn_periodic_report(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => monitor.report(),
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<f64>>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Measures one operation and records it on finish.
pub struct LoadTimer {
    start: Instant,
    metric: String,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl LoadTimer {
    /// Start timing `metric`.
    pub fn start(metric: impl Into<String>, monitor: Option<Arc<PerformanceMonitor>>) -> Self {
        Self {
            start: Instant::now(),
            metric: metric.into(),
            monitor,
        }
    }

    /// Stop timing and record the elapsed time if a monitor is attached.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        debug!("Completed {}: {}ms", self.metric, elapsed.as_millis());
        if let Some(monitor) = &self.monitor {
            monitor.record_duration(&self.metric, elapsed);
        }
        elapsed
    }
}
