use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use leadflow_email::{MessageBackend, MockBackend, SmtpBackend, SmtpConfig};
use leadflow_queue::{JobQueue, RetentionPolicy, RetryPolicy};
use leadflow_queue_memory::MemoryQueue;
use leadflow_queue_redis::{RedisQueue, RedisQueueConfig};
use leadflow_store::{DefinitionStore, EnrollmentStore, LeadStore, TemplateStore};
use leadflow_store_memory::MemoryStore;
use leadflow_store_postgres::{PostgresConfig, PostgresStore};

use crate::config::{QueueConfig, SmtpFileConfig, StoreConfig};

/// The four store handles the engine consumes, usually backed by one
/// shared backend instance.
pub struct Stores {
    pub definitions: Arc<dyn DefinitionStore>,
    pub enrollments: Arc<dyn EnrollmentStore>,
    pub leads: Arc<dyn LeadStore>,
    pub templates: Arc<dyn TemplateStore>,
}

/// Create the storage backend named by the configuration.
pub async fn create_stores(config: &StoreConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.backend.as_str() {
        "memory" => {
            info!("using in-memory store backend");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                definitions: store.clone(),
                enrollments: store.clone(),
                leads: store.clone(),
                templates: store,
            })
        }
        "postgres" => {
            let mut pg = PostgresConfig::default();
            if let Some(ref url) = config.url {
                pg.url = url.clone();
            }
            if let Some(ref schema) = config.schema {
                pg.schema = schema.clone();
            }
            if let Some(ref prefix) = config.table_prefix {
                pg.table_prefix = prefix.clone();
            }
            if let Some(pool_size) = config.pool_size {
                pg.pool_size = pool_size;
            }
            pg.ssl_mode = config.ssl_mode.clone();

            info!(schema = %pg.schema, "connecting PostgreSQL store backend");
            let store = Arc::new(PostgresStore::new(pg).await?);
            Ok(Stores {
                definitions: store.clone(),
                enrollments: store.clone(),
                leads: store.clone(),
                templates: store,
            })
        }
        other => Err(format!("unknown store backend: {other}").into()),
    }
}

/// Create the job queue backend named by the configuration.
pub fn create_queue(config: &QueueConfig) -> Result<Arc<dyn JobQueue>, Box<dyn std::error::Error>> {
    let mut retry = RetryPolicy::default();
    if let Some(attempts) = config.max_attempts {
        retry.max_attempts = attempts;
    }
    if let Some(ms) = config.initial_backoff_ms {
        retry.initial_backoff = Duration::from_millis(ms);
    }
    if let Some(ms) = config.max_backoff_ms {
        retry.max_backoff = Duration::from_millis(ms);
    }
    let retention = RetentionPolicy::default();

    match config.backend.as_str() {
        "memory" => {
            info!("using in-memory queue backend");
            Ok(Arc::new(MemoryQueue::with_policies(retry, retention)))
        }
        "redis" => {
            let mut redis = RedisQueueConfig::default();
            if let Some(ref url) = config.url {
                redis.url = url.clone();
            }
            if let Some(ref prefix) = config.prefix {
                redis.prefix = prefix.clone();
            }
            if let Some(seconds) = config.visibility_timeout_seconds {
                redis.visibility_timeout = Duration::from_secs(seconds);
            }

            info!(prefix = %redis.prefix, "connecting Redis queue backend");
            Ok(Arc::new(RedisQueue::new(redis, retry, retention)?))
        }
        other => Err(format!("unknown queue backend: {other}").into()),
    }
}

/// Create the outbound message backend.
///
/// Without an `[smtp]` section, sends are captured in memory and not
/// delivered — the development analogue of running without a
/// configured provider.
pub fn create_messenger(
    config: Option<&SmtpFileConfig>,
) -> Result<Arc<dyn MessageBackend>, Box<dyn std::error::Error>> {
    match config {
        Some(smtp) => {
            info!(host = %smtp.host, "using SMTP message backend");
            let backend = SmtpBackend::new(SmtpConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                tls: smtp.tls,
                from: smtp.from.clone(),
            })?;
            Ok(Arc::new(backend))
        }
        None => {
            info!("SMTP not configured, messages will be captured and not delivered");
            Ok(Arc::new(MockBackend::new()))
        }
    }
}
