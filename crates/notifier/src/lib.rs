//! Asynchronous notification delivery.
//!
//! A bounded queue feeds a fixed pool of workers. Each worker attempts
//! delivery through a [`DeliveryBackend`], retries failed attempts with
//! exponential backoff up to the configured cap, appends delivered
//! notifications to the shared store and records the outcome in
//! [`DeliveryMetrics`].
//!
//! Delivery status tracking: pending → delivered | failed.

pub mod delivery;
pub mod error;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod retry;

pub use delivery::{DeliveryBackend, DeliveryOutcome, ScriptedDelivery, SimulatedDelivery};
pub use error::NotifierError;
pub use job::Job;
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use queue::{NotificationQueue, QueueConfig, QueueHandle};
pub use retry::{RetryPolicy, Transition};
