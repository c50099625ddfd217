use std::time::Duration;

/// Configuration for the Redis queue backend.
#[derive(Debug, Clone)]
pub struct RedisQueueConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Key prefix applied to every Redis key to avoid collisions.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,

    /// How long a dequeued job may stay unsettled before it is
    /// re-delivered to another consumer.
    pub visibility_timeout: Duration,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("leadflow"),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}
