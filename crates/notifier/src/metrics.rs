//! Delivery metrics shared by all workers.
//!
//! Every field lives behind one mutex so a snapshot never shows a sent count
//! without its matching average.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default)]
struct Counters {
    total_sent: u64,
    total_failed: u64,
    active_workers: usize,
    cumulative_delivery: Duration,
    /// Successful deliveries folded into `average_ms`.
    notification_count: u64,
    average_ms: f64,
}

/// Consistent point-in-time view of [`DeliveryMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_sent: u64,
    pub total_failed: u64,
    pub active_workers: usize,
    pub average_delivery_ms: f64,
    pub cumulative_delivery_ms: f64,
}

impl MetricsSnapshot {
    /// Jobs that reached a terminal state.
    pub fn terminal_outcomes(&self) -> u64 {
        self.total_sent + self.total_failed
    }

    pub fn average_delivery_time(&self) -> Duration {
        Duration::from_secs_f64(self.average_delivery_ms / 1000.0)
    }
}

/// Thread-safe delivery counters.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    counters: Mutex<Counters>,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a delivered notification and fold `elapsed` into the running mean.
    pub fn record_success(&self, elapsed: Duration) {
        let mut c = self.lock();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let count = c.notification_count as f64;
        c.average_ms = (c.average_ms * count + elapsed_ms) / (count + 1.0);
        c.notification_count += 1;
        c.total_sent += 1;
        c.cumulative_delivery = c.cumulative_delivery.saturating_add(elapsed);
    }

    /// Count a notification dropped after exhausting its retries.
    pub fn record_failure(&self) {
        self.lock().total_failed += 1;
    }

    /// Mark a worker busy until the returned guard is dropped.
    pub fn track_active(&self) -> ActiveWorker<'_> {
        self.lock().active_workers += 1;
        ActiveWorker { metrics: self }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.lock();
        MetricsSnapshot {
            total_sent: c.total_sent,
            total_failed: c.total_failed,
            active_workers: c.active_workers,
            average_delivery_ms: c.average_ms,
            cumulative_delivery_ms: c.cumulative_delivery.as_secs_f64() * 1000.0,
        }
    }
}

/// Decrements the active worker count on drop.
#[derive(Debug)]
pub struct ActiveWorker<'a> {
    metrics: &'a DeliveryMetrics,
}

impl Drop for ActiveWorker<'_> {
    fn drop(&mut self) {
        let mut c = self.metrics.lock();
        c.active_workers = c.active_workers.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_zero() {
        let snapshot = DeliveryMetrics::new().snapshot();
        assert_eq!(snapshot.total_sent, 0);
        assert_eq!(snapshot.total_failed, 0);
        assert_eq!(snapshot.active_workers, 0);
        assert_eq!(snapshot.average_delivery_ms, 0.0);
    }

    #[test]
    fn test_average_is_arithmetic_mean() {
        let metrics = DeliveryMetrics::new();
        let samples = [10u64, 20, 60, 7, 3];
        for ms in samples {
            metrics.record_success(Duration::from_millis(ms));
        }
        let snapshot = metrics.snapshot();
        let mean = samples.iter().sum::<u64>() as f64 / samples.len() as f64;
        assert_eq!(snapshot.total_sent, 5);
        assert!((snapshot.average_delivery_ms - mean).abs() < 1e-9);
        assert!((snapshot.cumulative_delivery_ms - 100.0).abs() < 1e-9);
        let average = snapshot.average_delivery_time();
        assert!(average.abs_diff(Duration::from_millis(20)) < Duration::from_micros(1));
    }

    #[test]
    fn test_failures_do_not_move_average() {
        let metrics = DeliveryMetrics::new();
        metrics.record_success(Duration::from_millis(4));
        metrics.record_failure();
        metrics.record_failure();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_failed, 2);
        assert_eq!(snapshot.terminal_outcomes(), 3);
        assert!((snapshot.average_delivery_ms - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_active_worker_guard() {
        let metrics = DeliveryMetrics::new();
        {
            let _a = metrics.track_active();
            let _b = metrics.track_active();
            assert_eq!(metrics.snapshot().active_workers, 2);
        }
        assert_eq!(metrics.snapshot().active_workers, 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(DeliveryMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if i % 2 == 0 {
                            metrics.record_success(Duration::from_millis(2));
                        } else {
                            metrics.record_failure();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_sent, 2000);
        assert_eq!(snapshot.total_failed, 2000);
        assert!((snapshot.average_delivery_ms - 2.0).abs() < 1e-9);
    }
}
