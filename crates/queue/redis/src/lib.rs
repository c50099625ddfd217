//! Redis-backed durable job queue.
//!
//! Live-broker tests run with `cargo test -- --ignored` against
//! `LEADFLOW_TEST_REDIS_URL`.

pub mod config;
pub mod queue;
mod scripts;

pub use config::RedisQueueConfig;
pub use queue::RedisQueue;
