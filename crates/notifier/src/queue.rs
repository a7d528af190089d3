//! Bounded notification queue and its worker pool.
//!
//! Producers enqueue through a cloneable [`QueueHandle`]; a full queue makes
//! them wait. Workers share the receiving end and run each job through the
//! retry state machine in [`crate::retry`]. A failed attempt sleeps its backoff
//! on the owning worker, then goes back onto the queue as the next attempt. If
//! the queue is full or closing at that moment, the worker keeps the job and
//! attempts it again itself, so a retry can never wait on queue capacity.
//!
//! `stop` cancels the pool, closes the queue to producers, and lets the workers
//! drain every job that was already accepted before it returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fanout_common::config::AppConfig;
use fanout_common::store::Store;
use fanout_common::types::Notification;

use crate::delivery::DeliveryBackend;
use crate::error::NotifierError;
use crate::job::Job;
use crate::metrics::DeliveryMetrics;
use crate::retry::{RetryPolicy, Transition};

/// Worker pool sizing and retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub worker_count: usize,
    /// Attempts per job, the first one included.
    pub max_retries: u32,
    pub capacity: usize,
    pub backoff_unit: Duration,
}

impl QueueConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_unit)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            max_retries: 3,
            capacity: 1000,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl From<&AppConfig> for QueueConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            worker_count: config.notifier_workers,
            max_retries: config.notifier_max_retries,
            capacity: config.notifier_queue_capacity,
            backoff_unit: Duration::from_millis(config.notifier_backoff_base_ms),
        }
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<Job>,
    shutdown: CancellationToken,
}

impl QueueHandle {
    /// Queue a fresh job (attempt 1) for `notification`.
    ///
    /// Waits while the queue is full. Fails with [`NotifierError::QueueClosed`]
    /// once the queue has been stopped.
    pub async fn enqueue(&self, notification: Notification) -> Result<(), NotifierError> {
        if self.shutdown.is_cancelled() {
            return Err(NotifierError::QueueClosed);
        }
        self.tx
            .send(Job::new(notification))
            .await
            .map_err(|_| NotifierError::QueueClosed)
    }

    /// Jobs currently buffered.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// State shared by every worker.
struct WorkerContext<D> {
    rx: Mutex<mpsc::Receiver<Job>>,
    retry_tx: mpsc::Sender<Job>,
    store: Arc<Store>,
    metrics: Arc<DeliveryMetrics>,
    backend: D,
    policy: RetryPolicy,
    shutdown: CancellationToken,
}

impl<D: DeliveryBackend> WorkerContext<D> {
    async fn next_job(&self) -> Option<Job> {
        self.rx.lock().await.recv().await
    }

    /// Non-blocking receive used while draining. Closes the queue first so
    /// no producer can add work behind the drain.
    async fn try_next_job(&self) -> Option<Job> {
        let mut rx = self.rx.lock().await;
        rx.close();
        rx.try_recv().ok()
    }

    async fn run(&self, worker_id: usize) {
        tracing::info!(worker_id, "Notification worker started");

        loop {
            let next = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => None,
                job = self.next_job() => job,
            };
            match next {
                Some(job) => self.process(worker_id, job).await,
                None => break,
            }
        }

        let mut drained = 0usize;
        while let Some(job) = self.try_next_job().await {
            self.process(worker_id, job).await;
            drained += 1;
        }

        tracing::info!(worker_id, drained, "Notification worker stopped");
    }

    /// Run one job until it is delivered, exhausted, or handed back to the queue.
    async fn process(&self, worker_id: usize, mut job: Job) {
        let _active = self.metrics.track_active();

        loop {
            let outcome = self.backend.attempt(&job.notification).await;

            if outcome.delivered {
                job.notification.mark_delivered();
                tracing::debug!(
                    worker_id,
                    notification_id = %job.notification.id,
                    user_id = %job.notification.user_id,
                    post_id = %job.notification.post_id,
                    attempt = job.attempt,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Notification delivered"
                );
                self.store.append_notification(job.notification);
                self.metrics.record_success(outcome.elapsed);
                return;
            }

            tracing::warn!(
                worker_id,
                notification_id = %job.notification.id,
                user_id = %job.notification.user_id,
                post_id = %job.notification.post_id,
                attempt = job.attempt,
                "Notification delivery failed"
            );

            match self.policy.next(job.attempt) {
                Transition::Exhausted => {
                    job.notification.mark_failed();
                    tracing::warn!(
                        worker_id,
                        notification_id = %job.notification.id,
                        user_id = %job.notification.user_id,
                        attempts = job.attempt,
                        "Max retries exceeded, dropping notification"
                    );
                    self.metrics.record_failure();
                    return;
                }
                Transition::Retry {
                    next_attempt,
                    backoff,
                } => {
                    tracing::debug!(
                        worker_id,
                        notification_id = %job.notification.id,
                        next_attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying notification after backoff"
                    );
                    job.notification.mark_retry();
                    tokio::time::sleep(backoff).await;

                    match self.retry_tx.try_send(job.retry()) {
                        Ok(()) => return,
                        Err(
                            mpsc::error::TrySendError::Full(returned)
                            | mpsc::error::TrySendError::Closed(returned),
                        ) => {
                            tracing::debug!(
                                worker_id,
                                notification_id = %returned.notification.id,
                                "Queue unavailable for retry, keeping job on this worker"
                            );
                            job = returned;
                        }
                    }
                }
            }
        }
    }
}

/// Fixed-size worker pool draining a bounded notification queue.
pub struct NotificationQueue<D: DeliveryBackend> {
    handle: QueueHandle,
    ctx: Arc<WorkerContext<D>>,
    config: QueueConfig,
    workers: Vec<JoinHandle<()>>,
    started: bool,
}

impl<D: DeliveryBackend> NotificationQueue<D> {
    /// Build a queue. Metrics start at zero; no worker runs until [`start`](Self::start).
    pub fn new(store: Arc<Store>, backend: D, config: QueueConfig) -> Self {
        let config = QueueConfig {
            worker_count: config.worker_count.max(1),
            capacity: config.capacity.max(1),
            ..config
        };
        let (tx, rx) = mpsc::channel(config.capacity);
        let shutdown = CancellationToken::new();

        let ctx = Arc::new(WorkerContext {
            rx: Mutex::new(rx),
            retry_tx: tx.clone(),
            store,
            metrics: Arc::new(DeliveryMetrics::new()),
            backend,
            policy: config.retry_policy(),
            shutdown: shutdown.clone(),
        });

        Self {
            handle: QueueHandle { tx, shutdown },
            ctx,
            config,
            workers: Vec::new(),
            started: false,
        }
    }

    /// Spawn the worker pool. Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<(), NotifierError> {
        if self.started {
            return Err(NotifierError::AlreadyStarted);
        }
        if self.handle.is_closed() {
            return Err(NotifierError::QueueClosed);
        }

        tracing::info!(
            worker_count = self.config.worker_count,
            max_retries = self.config.max_retries,
            capacity = self.config.capacity,
            backoff_ms = self.config.backoff_unit.as_millis() as u64,
            "Starting notification workers"
        );

        for worker_id in 0..self.config.worker_count {
            let ctx = Arc::clone(&self.ctx);
            self.workers
                .push(tokio::spawn(async move { ctx.run(worker_id).await }));
        }
        self.started = true;
        Ok(())
    }

    /// Stop accepting work, let the workers finish every accepted job, and
    /// wait for all of them to exit.
    pub async fn stop(mut self) {
        tracing::info!(buffered = self.handle.len(), "Stopping notification queue");
        self.handle.shutdown.cancel();

        for (worker_id, worker) in std::mem::take(&mut self.workers).into_iter().enumerate() {
            if let Err(e) = worker.await {
                tracing::error!(worker_id, error = %e, "Notification worker panicked");
            }
        }

        // Only non-empty when the pool was never started. Each leftover job
        // is terminal and counts as failed.
        let abandoned = {
            let mut rx = self.ctx.rx.lock().await;
            rx.close();
            let mut count = 0usize;
            while rx.try_recv().is_ok() {
                self.ctx.metrics.record_failure();
                count += 1;
            }
            count
        };
        if abandoned > 0 {
            tracing::warn!(
                abandoned,
                "Queue stopped before any worker ran; jobs counted as failed"
            );
        }

        let snapshot = self.ctx.metrics.snapshot();
        tracing::info!(
            total_sent = snapshot.total_sent,
            total_failed = snapshot.total_failed,
            "Notification queue stopped"
        );
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        Arc::clone(&self.ctx.metrics)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Convenience for [`QueueHandle::enqueue`].
    pub async fn enqueue(&self, notification: Notification) -> Result<(), NotifierError> {
        self.handle.enqueue(notification).await
    }
}

impl<D: DeliveryBackend> Drop for NotificationQueue<D> {
    fn drop(&mut self) {
        // Workers finish their current job and exit on their own.
        self.handle.shutdown.cancel();
    }
}
