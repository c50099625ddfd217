use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leadflow_core::Job;

use crate::error::QueueError;

/// One at-least-once handoff of a job to a consumer.
///
/// A delivery must be settled with [`JobQueue::ack`] or
/// [`JobQueue::nack`]; backends use `token` to identify the in-flight
/// entry.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub job: Job,
    /// Backend-specific handle for settling this delivery.
    pub token: String,
}

/// What a nack did with the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NackOutcome {
    /// The job was rescheduled with the given backoff.
    Retried { delay: Duration },
    /// The job exhausted its attempts and was dead-lettered.
    DeadLettered,
}

/// A job that exhausted all retry attempts.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job: Job,
    /// Final error reported by the consumer.
    pub error: String,
    /// Delivery attempts made before giving up.
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

/// A durable, at-least-once delayed job queue.
///
/// Producers enqueue fire-and-forget; the queue guarantees eventual
/// delivery with retry. Jobs for the same enrollment may be delivered
/// out of order or more than once; consumers own the idempotence
/// story.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job, optionally delayed. Returns once the job is
    /// durably accepted.
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<(), QueueError>;

    /// Pull the next ready job, if any. Non-blocking: consumers poll.
    async fn dequeue(&self) -> Result<Option<Delivery>, QueueError>;

    /// Settle a delivery as successfully processed.
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Settle a delivery as failed: reschedule per the retry policy or
    /// dead-letter once attempts are exhausted.
    async fn nack(&self, delivery: &Delivery, error: &str) -> Result<NackOutcome, QueueError>;

    /// Number of jobs waiting or delayed (not in-flight).
    async fn pending(&self) -> Result<usize, QueueError>;
}
