//! Queue backend conformance suite.
//!
//! Call from a backend's test module with a queue configured with
//! `max_attempts = 3` and **zero** initial backoff — the retry checks
//! re-dequeue immediately instead of waiting out real backoffs.

use std::time::Duration;

use leadflow_core::{Job, JobPayload, LeadId, TenantId, TriggerKind};

use crate::error::QueueError;
use crate::queue::{JobQueue, NackOutcome};

fn test_job() -> Job {
    Job::new(JobPayload::ProcessTrigger {
        tenant: TenantId::new("conformance-org"),
        lead_id: LeadId::generate(),
        trigger: TriggerKind::LeadCreated,
    })
}

/// Run the full queue conformance suite.
///
/// # Errors
///
/// Returns an error if any conformance check fails.
pub async fn run_queue_conformance_tests(queue: &dyn JobQueue) -> Result<(), QueueError> {
    test_roundtrip(queue).await?;
    test_empty_dequeue(queue).await?;
    test_delayed_stays_parked(queue).await?;
    test_retry_then_dead_letter(queue).await?;
    test_settle_unknown_token(queue).await?;
    Ok(())
}

async fn test_roundtrip(queue: &dyn JobQueue) -> Result<(), QueueError> {
    let job = test_job();
    queue.enqueue(job.clone(), None).await?;

    let delivery = queue.dequeue().await?;
    let delivery = delivery.expect("enqueued job should be ready");
    assert_eq!(delivery.job.id, job.id);
    assert_eq!(delivery.job.attempt, 0);

    queue.ack(&delivery).await?;
    Ok(())
}

async fn test_empty_dequeue(queue: &dyn JobQueue) -> Result<(), QueueError> {
    let delivery = queue.dequeue().await?;
    assert!(delivery.is_none(), "empty queue should dequeue None");
    Ok(())
}

async fn test_delayed_stays_parked(queue: &dyn JobQueue) -> Result<(), QueueError> {
    let before = queue.pending().await?;
    queue
        .enqueue(test_job(), Some(Duration::from_secs(3600)))
        .await?;

    assert!(
        queue.dequeue().await?.is_none(),
        "delayed job must not be delivered early"
    );
    assert_eq!(
        queue.pending().await?,
        before + 1,
        "delayed job still counts as pending"
    );
    Ok(())
}

async fn test_retry_then_dead_letter(queue: &dyn JobQueue) -> Result<(), QueueError> {
    let job = test_job();
    queue.enqueue(job.clone(), None).await?;

    // Attempts 0 and 1 fail and reschedule (zero backoff makes the
    // retries immediately ready again).
    for expected_attempt in 0..2 {
        let delivery = queue.dequeue().await?.expect("job should be ready");
        assert_eq!(delivery.job.id, job.id);
        assert_eq!(delivery.job.attempt, expected_attempt);
        let outcome = queue.nack(&delivery, "conformance failure").await?;
        assert!(
            matches!(outcome, NackOutcome::Retried { .. }),
            "attempt {expected_attempt} should be retried"
        );
    }

    // Attempt 2 is the last: the job dead-letters.
    let delivery = queue.dequeue().await?.expect("final attempt ready");
    assert_eq!(delivery.job.attempt, 2);
    let outcome = queue.nack(&delivery, "conformance failure").await?;
    assert_eq!(outcome, NackOutcome::DeadLettered);

    assert!(
        queue.dequeue().await?.is_none(),
        "dead-lettered job must not be re-delivered"
    );
    Ok(())
}

async fn test_settle_unknown_token(queue: &dyn JobQueue) -> Result<(), QueueError> {
    let delivery = crate::queue::Delivery {
        job: test_job(),
        token: "conformance-ghost".to_owned(),
    };
    assert!(
        queue.ack(&delivery).await.is_err(),
        "acking an unknown delivery should error"
    );
    Ok(())
}
