use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, warn};

use leadflow_core::Job;

use crate::error::QueueError;
use crate::queue::{JobQueue, NackOutcome};

/// Consumer-side processing of one job.
///
/// Errors are settled as nacks, feeding the queue's retry policy.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Configuration for the consume loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent consumer tasks.
    pub concurrency: usize,
    /// Poll interval while the queue is empty.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Drives a [`JobHandler`] from a [`JobQueue`].
///
/// Spawns `concurrency` consumer tasks, each polling the queue and
/// settling every delivery. Stops draining when the shutdown signal
/// flips; in-flight jobs finish before `run` returns.
pub struct JobWorker {
    queue: Arc<dyn JobQueue>,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
}

impl JobWorker {
    /// Create a worker over an explicitly constructed queue handle.
    #[must_use]
    pub fn new(queue: Arc<dyn JobQueue>, handler: Arc<dyn JobHandler>, config: WorkerConfig) -> Self {
        Self {
            queue,
            handler,
            config,
        }
    }

    /// Run consumers until `shutdown` observes `true`.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut tasks = Vec::with_capacity(self.config.concurrency);
        for consumer in 0..self.config.concurrency {
            let queue = Arc::clone(&self.queue);
            let handler = Arc::clone(&self.handler);
            let poll_interval = self.config.poll_interval;
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                consume_loop(consumer, queue, handler, poll_interval, shutdown).await;
            }));
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "consumer task panicked");
            }
        }
    }
}

async fn consume_loop(
    consumer: usize,
    queue: Arc<dyn JobQueue>,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut poll = interval(poll_interval);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown.borrow() {
                    debug!(consumer, "consumer shutting down");
                    return;
                }
            }
            _ = poll.tick() => {
                // Drain everything ready before going back to sleep.
                loop {
                    if *shutdown.borrow() {
                        debug!(consumer, "consumer shutting down");
                        return;
                    }
                    match queue.dequeue().await {
                        Ok(Some(delivery)) => {
                            process_delivery(queue.as_ref(), handler.as_ref(), delivery).await;
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!(consumer, error = %e, "dequeue failed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn process_delivery(
    queue: &dyn JobQueue,
    handler: &dyn JobHandler,
    delivery: crate::queue::Delivery,
) {
    let job_id = delivery.job.id.clone();
    let kind = delivery.job.payload.kind();

    match handler.handle(&delivery.job).await {
        Ok(()) => {
            if let Err(e) = queue.ack(&delivery).await {
                error!(job_id = %job_id, error = %e, "ack failed");
            }
        }
        Err(handler_error) => {
            warn!(job_id = %job_id, kind, error = %handler_error, "job handler failed");
            match queue.nack(&delivery, &handler_error.to_string()).await {
                Ok(NackOutcome::Retried { delay }) => {
                    debug!(job_id = %job_id, delay_ms = %delay.as_millis(), "job scheduled for retry");
                }
                Ok(NackOutcome::DeadLettered) => {
                    error!(job_id = %job_id, kind, "job dead-lettered");
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "nack failed");
                }
            }
        }
    }
}

/// Drain the queue inline until it reports no pending jobs.
///
/// Test/dev helper: processes jobs on the caller's task, serially, so
/// scenarios can run to quiescence without spawning consumers. Delayed
/// jobs are waited for, bounded by `timeout`.
///
/// # Errors
///
/// Returns [`QueueError::Backend`] if the queue does not quiesce
/// within `timeout`.
pub async fn drain(
    queue: &dyn JobQueue,
    handler: &dyn JobHandler,
    timeout: Duration,
) -> Result<(), QueueError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match queue.dequeue().await? {
            Some(delivery) => {
                process_delivery(queue, handler, delivery).await;
            }
            None => {
                if queue.pending().await? == 0 {
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(QueueError::Backend(
                        "queue did not quiesce within the drain timeout".to_owned(),
                    ));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}
