pub mod error;
pub mod policy;
pub mod queue;
pub mod testing;
pub mod worker;

pub use error::QueueError;
pub use policy::{RetentionPolicy, RetryPolicy};
pub use queue::{DeadLetter, Delivery, JobQueue, NackOutcome};
pub use worker::{JobHandler, JobWorker, WorkerConfig, drain};
