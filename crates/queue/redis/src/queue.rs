use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, Script};

use leadflow_core::Job;
use leadflow_queue::{
    DeadLetter, Delivery, JobQueue, NackOutcome, QueueError, RetentionPolicy, RetryPolicy,
};

use crate::config::RedisQueueConfig;
use crate::scripts;

/// Redis-backed implementation of [`JobQueue`].
///
/// Jobs live in a `data` hash; scheduling state moves between a
/// `delayed` sorted set, a `ready` list, and a `processing` sorted set
/// whose scores are visibility deadlines. All multi-key transitions run
/// as Lua scripts so concurrent workers never observe a half-moved job.
/// A consumer that dies without settling loses its claim when the
/// visibility deadline passes and the job is re-delivered — the
/// at-least-once half of the contract.
pub struct RedisQueue {
    pool: Pool,
    config: RedisQueueConfig,
    retry: RetryPolicy,
    retention: RetentionPolicy,
}

impl RedisQueue {
    /// Create a `RedisQueue` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Connection`] if the pool cannot be created.
    pub fn new(
        config: RedisQueueConfig,
        retry: RetryPolicy,
        retention: RetentionPolicy,
    ) -> Result<Self, QueueError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| QueueError::Connection(e.to_string()))?
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            config,
            retry,
            retention,
        })
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:jobs:{suffix}", self.config.prefix)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, QueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }

    /// Move due delayed jobs and expired processing claims to `ready`.
    async fn promote(&self, conn: &mut deadpool_redis::Connection) -> Result<(), QueueError> {
        let script = Script::new(scripts::PROMOTE);
        let _: i64 = script
            .key(self.key("delayed"))
            .key(self.key("ready"))
            .key(self.key("processing"))
            .arg(Utc::now().timestamp_millis())
            .invoke_async(conn)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&job)?;
        let mut conn = self.conn().await?;

        match delay {
            Some(delay) if !delay.is_zero() => {
                let ready_at = Utc::now().timestamp_millis()
                    + i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
                redis::pipe()
                    .hset(self.key("data"), &job.id, payload)
                    .ignore()
                    .zadd(self.key("delayed"), &job.id, ready_at)
                    .ignore()
                    .exec_async(&mut conn)
                    .await
                    .map_err(|e| QueueError::Backend(e.to_string()))?;
            }
            _ => {
                redis::pipe()
                    .hset(self.key("data"), &job.id, payload)
                    .ignore()
                    .rpush(self.key("ready"), &job.id)
                    .ignore()
                    .exec_async(&mut conn)
                    .await
                    .map_err(|e| QueueError::Backend(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.conn().await?;
        self.promote(&mut conn).await?;

        let deadline = Utc::now().timestamp_millis()
            + i64::try_from(self.config.visibility_timeout.as_millis()).unwrap_or(i64::MAX);

        let script = Script::new(scripts::DEQUEUE);
        let payload: Option<String> = script
            .key(self.key("ready"))
            .key(self.key("processing"))
            .key(self.key("data"))
            .arg(deadline)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        let job: Job = serde_json::from_str(&payload)?;
        let token = job.id.clone();
        Ok(Some(Delivery { job, token }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&delivery.job)?;
        let completed_ttl =
            i64::try_from(self.retention.completed_ttl.as_millis()).unwrap_or(i64::MAX);
        let mut conn = self.conn().await?;

        let script = Script::new(scripts::ACK);
        let settled: i64 = script
            .key(self.key("processing"))
            .key(self.key("data"))
            .key(self.key("completed"))
            .arg(&delivery.token)
            .arg(payload)
            .arg(self.retention.max_completed)
            .arg(completed_ttl)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        if settled == 0 {
            return Err(QueueError::Backend(format!(
                "delivery not in flight: {}",
                delivery.token
            )));
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, error: &str) -> Result<NackOutcome, QueueError> {
        let mut conn = self.conn().await?;
        let completed_attempts = delivery.job.attempt + 1;

        if self.retry.is_exhausted(completed_attempts) {
            let dead = DeadLetter {
                job: delivery.job.clone(),
                error: error.to_owned(),
                attempts: completed_attempts,
                failed_at: Utc::now(),
            };
            let record = serde_json::json!({
                "job": dead.job,
                "error": dead.error,
                "attempts": dead.attempts,
                "failed_at": dead.failed_at,
            })
            .to_string();

            let script = Script::new(scripts::NACK_DEAD);
            let settled: i64 = script
                .key(self.key("processing"))
                .key(self.key("data"))
                .key(self.key("dead"))
                .arg(&delivery.token)
                .arg(record)
                .arg(self.retention.max_failed)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| QueueError::Backend(e.to_string()))?;

            if settled == 0 {
                return Err(QueueError::Backend(format!(
                    "delivery not in flight: {}",
                    delivery.token
                )));
            }
            return Ok(NackOutcome::DeadLettered);
        }

        let delay = self.retry.backoff_for(delivery.job.attempt);
        let mut job = delivery.job.clone();
        job.attempt = completed_attempts;
        let payload = serde_json::to_string(&job)?;
        let retry_at =
            Utc::now().timestamp_millis() + i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);

        let script = Script::new(scripts::NACK_RETRY);
        let settled: i64 = script
            .key(self.key("processing"))
            .key(self.key("data"))
            .key(self.key("delayed"))
            .arg(&delivery.token)
            .arg(payload)
            .arg(retry_at)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        if settled == 0 {
            return Err(QueueError::Backend(format!(
                "delivery not in flight: {}",
                delivery.token
            )));
        }
        Ok(NackOutcome::Retried { delay })
    }

    async fn pending(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn().await?;
        let ready: usize = conn
            .llen(self.key("ready"))
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        let delayed: usize = conn
            .zcard(self.key("delayed"))
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        Ok(ready + delayed)
    }
}
