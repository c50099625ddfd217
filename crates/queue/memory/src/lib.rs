//! In-process delayed job queue.
//!
//! At-least-once semantics over process-local state: a ready deque, a
//! delay heap, and an in-flight map keyed by delivery token. Suitable
//! for tests and single-process development; nothing survives restart.
//!
//! Time is measured with [`tokio::time::Instant`], so tests running
//! under a paused clock can fast-forward through delays.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use leadflow_core::Job;
use leadflow_queue::{
    DeadLetter, Delivery, JobQueue, NackOutcome, QueueError, RetentionPolicy, RetryPolicy,
};

/// Entry parked in the delay heap until its ready time.
struct DelayedJob {
    ready_at: Instant,
    /// The delay requested at enqueue time, kept for inspection.
    requested_delay: Duration,
    job: Job,
}

impl PartialEq for DelayedJob {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at
    }
}

impl Eq for DelayedJob {}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest
        // ready time on top.
        other.ready_at.cmp(&self.ready_at)
    }
}

#[derive(Default)]
struct Inner {
    ready: VecDeque<Job>,
    delayed: BinaryHeap<DelayedJob>,
    in_flight: HashMap<String, Job>,
    completed: VecDeque<Job>,
    dead: VecDeque<DeadLetter>,
}

impl Inner {
    /// Promote every delayed job whose ready time has passed.
    fn promote_ready(&mut self, now: Instant) {
        while self.delayed.peek().is_some_and(|e| e.ready_at <= now) {
            if let Some(entry) = self.delayed.pop() {
                self.ready.push_back(entry.job);
            }
        }
    }
}

/// In-memory implementation of [`JobQueue`].
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    retry: RetryPolicy,
    retention: RetentionPolicy,
}

impl MemoryQueue {
    /// Create a queue with default retry and retention policies.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policies(RetryPolicy::default(), RetentionPolicy::default())
    }

    /// Create a queue with explicit policies.
    #[must_use]
    pub fn with_policies(retry: RetryPolicy, retention: RetentionPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            retry,
            retention,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory queue mutex poisoned")
    }

    /// Jobs currently parked in the delay heap, with their requested
    /// delays (test inspection).
    #[must_use]
    pub fn delayed_jobs(&self) -> Vec<(Job, Duration)> {
        self.lock()
            .delayed
            .iter()
            .map(|e| (e.job.clone(), e.requested_delay))
            .collect()
    }

    /// Dead-lettered jobs (test inspection).
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.lock().dead.iter().cloned().collect()
    }

    /// Successfully processed jobs still retained (test inspection).
    #[must_use]
    pub fn completed_jobs(&self) -> Vec<Job> {
        self.lock().completed.iter().cloned().collect()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<(), QueueError> {
        let mut inner = self.lock();
        match delay {
            Some(delay) if !delay.is_zero() => {
                inner.delayed.push(DelayedJob {
                    ready_at: Instant::now() + delay,
                    requested_delay: delay,
                    job,
                });
            }
            _ => inner.ready.push_back(job),
        }
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, QueueError> {
        let mut inner = self.lock();
        inner.promote_ready(Instant::now());

        let Some(job) = inner.ready.pop_front() else {
            return Ok(None);
        };
        let token = format!("{}:{}", job.id, job.attempt);
        inner.in_flight.insert(token.clone(), job.clone());
        Ok(Some(Delivery { job, token }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut inner = self.lock();
        let Some(job) = inner.in_flight.remove(&delivery.token) else {
            return Err(QueueError::Backend(format!(
                "unknown delivery token: {}",
                delivery.token
            )));
        };
        inner.completed.push_back(job);
        while inner.completed.len() > self.retention.max_completed {
            inner.completed.pop_front();
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, error: &str) -> Result<NackOutcome, QueueError> {
        let mut inner = self.lock();
        let Some(mut job) = inner.in_flight.remove(&delivery.token) else {
            return Err(QueueError::Backend(format!(
                "unknown delivery token: {}",
                delivery.token
            )));
        };

        let completed_attempts = job.attempt + 1;
        if self.retry.is_exhausted(completed_attempts) {
            inner.dead.push_back(DeadLetter {
                job,
                error: error.to_owned(),
                attempts: completed_attempts,
                failed_at: Utc::now(),
            });
            while inner.dead.len() > self.retention.max_failed {
                inner.dead.pop_front();
            }
            return Ok(NackOutcome::DeadLettered);
        }

        let delay = self.retry.backoff_for(job.attempt);
        job.attempt = completed_attempts;
        inner.delayed.push(DelayedJob {
            ready_at: Instant::now() + delay,
            requested_delay: delay,
            job,
        });
        Ok(NackOutcome::Retried { delay })
    }

    async fn pending(&self) -> Result<usize, QueueError> {
        let inner = self.lock();
        Ok(inner.ready.len() + inner.delayed.len())
    }
}
