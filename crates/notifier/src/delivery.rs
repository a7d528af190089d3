//! Delivery backends.
//!
//! The queue only needs to know whether an attempt succeeded and how long it
//! took. [`SimulatedDelivery`] stands in for a real transport and fails a
//! fixed fraction of attempts; [`ScriptedDelivery`] replays per-recipient
//! outcomes for deterministic tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;

use fanout_common::types::Notification;

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    pub elapsed: Duration,
}

/// A transport that can attempt to hand a notification to its recipient.
pub trait DeliveryBackend: Send + Sync + 'static {
    fn attempt(&self, notification: &Notification)
    -> impl Future<Output = DeliveryOutcome> + Send;
}

impl<T: DeliveryBackend> DeliveryBackend for Arc<T> {
    fn attempt(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = DeliveryOutcome> + Send {
        (**self).attempt(notification)
    }
}

/// Default probability that a simulated attempt fails.
pub const DEFAULT_FAILURE_RATE: f64 = 0.1;

/// Random-failure stand-in for a device push transport.
#[derive(Debug, Clone)]
pub struct SimulatedDelivery {
    failure_rate: f64,
    max_latency: Duration,
}

impl SimulatedDelivery {
    /// `failure_rate` is clamped to `[0, 1]`. Each attempt sleeps a uniform
    /// random latency in `[0, max_latency]`.
    pub fn new(failure_rate: f64, max_latency: Duration) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            DEFAULT_FAILURE_RATE
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            failure_rate,
            max_latency,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl Default for SimulatedDelivery {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_RATE, Duration::ZERO)
    }
}

impl DeliveryBackend for SimulatedDelivery {
    fn attempt(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = DeliveryOutcome> + Send {
        let started = Instant::now();
        let (fails, latency) = {
            let mut rng = rand::thread_rng();
            let latency = if self.max_latency.is_zero() {
                Duration::ZERO
            } else {
                rng.gen_range(Duration::ZERO..=self.max_latency)
            };
            (rng.gen_bool(self.failure_rate), latency)
        };
        let recipient = notification.user_id.clone();

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if fails {
                tracing::debug!(user_id = %recipient, "Simulated delivery failure");
            }
            DeliveryOutcome {
                delivered: !fails,
                elapsed: started.elapsed(),
            }
        }
    }
}

/// One attempt observed by [`ScriptedDelivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub notification_id: String,
    pub recipient: String,
    /// Failed attempts before this one.
    pub retry_count: u32,
}

/// Deterministic backend: replays scripted outcomes per recipient, then
/// falls back to a default.
#[derive(Debug)]
pub struct ScriptedDelivery {
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    fallback: bool,
    latency: Duration,
    log: Mutex<Vec<AttemptRecord>>,
}

impl ScriptedDelivery {
    pub fn new(fallback: bool) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            latency: Duration::ZERO,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn always_succeed() -> Self {
        Self::new(true)
    }

    pub fn always_fail() -> Self {
        Self::new(false)
    }

    /// Every attempt sleeps and reports exactly `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue outcomes for attempts addressed to `recipient`.
    pub fn script<I>(self, recipient: impl Into<String>, outcomes: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(recipient.into())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Attempts seen so far, in the order they started.
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attempts_for(&self, notification_id: &str) -> Vec<AttemptRecord> {
        self.attempts()
            .into_iter()
            .filter(|r| r.notification_id == notification_id)
            .collect()
    }
}

impl DeliveryBackend for ScriptedDelivery {
    fn attempt(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = DeliveryOutcome> + Send {
        let delivered = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&notification.user_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.fallback);

        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AttemptRecord {
                notification_id: notification.id.clone(),
                recipient: notification.user_id.clone(),
                retry_count: notification.retry_count,
            });

        let latency = self.latency;
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            DeliveryOutcome {
                delivered,
                elapsed: latency,
            }
        }
    }
}
