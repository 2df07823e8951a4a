use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use storefront_shared::types::server_stats::HttpInfo;

/// Latency samples kept for percentile estimates
const LATENCY_WINDOW: usize = 1000;

/// Request counters shared by every listener.
///
/// Streaming responses count as finished once their headers are sent.
#[derive(Clone, Debug)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    total_requests: AtomicU64,
    active_requests: AtomicUsize,
    error_count: AtomicU64,
    latencies: Mutex<LatencyTracker>,
}

/// Ring buffer of the most recent request latencies
#[derive(Debug)]
struct LatencyTracker {
    buffer: Vec<Duration>,
    index: usize,
    capacity: usize,
}

impl LatencyTracker {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            index: 0,
            capacity,
        }
    }

    fn record(&mut self, duration: Duration) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(duration);
        } else {
            self.buffer[self.index] = duration;
            self.index = (self.index + 1) % self.capacity;
        }
    }

    fn percentile(&self, p: f64) -> Option<Duration> {
        if self.buffer.is_empty() {
            return None;
        }

        let mut sorted = self.buffer.clone();
        sorted.sort();

        let index = ((p / 100.0) * sorted.len() as f64) as usize;
        sorted.get(index.min(sorted.len() - 1)).copied()
    }

    fn average(&self) -> Option<Duration> {
        if self.buffer.is_empty() {
            return None;
        }

        let sum: Duration = self.buffer.iter().sum();
        Some(sum / self.buffer.len() as u32)
    }
}

fn as_millis(d: Option<Duration>) -> f64 {
    d.map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0)
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                total_requests: AtomicU64::new(0),
                active_requests: AtomicUsize::new(0),
                error_count: AtomicU64::new(0),
                latencies: Mutex::new(LatencyTracker::new(LATENCY_WINDOW)),
            }),
        }
    }

    pub fn request_start(&self) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        self.inner.active_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_end(&self, duration: Duration) {
        self.inner.active_requests.fetch_sub(1, Ordering::Relaxed);
        self.inner
            .latencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(duration);
    }

    pub fn record_error(&self) {
        self.inner.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters in the shape served by the dashboard
    pub fn snapshot(&self) -> HttpInfo {
        let latencies = self
            .inner
            .latencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        HttpInfo {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            active_requests: self.inner.active_requests.load(Ordering::Relaxed),
            error_count: self.inner.error_count.load(Ordering::Relaxed),
            latency_avg_ms: as_millis(latencies.average()),
            latency_p95_ms: as_millis(latencies.percentile(95.0)),
        }
    }
}
