//! Queue error types.

use shortgen_models::{JobId, JobStatus};
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job already exists: {0}")]
    JobExists(JobId),

    #[error("Duplicate job {key} (active as {existing})")]
    Duplicate { key: String, existing: JobId },

    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Queue is full")]
    QueueFull,

    #[error("Queue is closed")]
    QueueClosed,
}

impl QueueError {
    pub fn invalid_transition(job_id: &JobId, from: JobStatus, to: JobStatus) -> Self {
        Self::InvalidTransition {
            job_id: job_id.clone(),
            from,
            to,
        }
    }
}
