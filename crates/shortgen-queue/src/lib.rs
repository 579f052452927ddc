//! In-process job queue for highlight jobs.
//!
//! This crate provides:
//! - A bounded submission queue with idempotency-key deduplication
//! - A concurrent job store with compare-and-set status transitions
//! - Progress events over a broadcast channel

pub mod error;
pub mod progress;
pub mod queue;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use progress::{JobSubscription, ProgressChannel, ProgressEvent, ProgressKind};
pub use queue::{JobQueue, JobReceiver};
pub use store::JobStore;
