//! Bounded submission queue.

use std::collections::HashMap;
use std::sync::Arc;

use shortgen_models::{HighlightJob, JobId};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};

/// Producer side of the job queue.
///
/// Cloning shares the same channel and deduplication table.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<HighlightJob>,
    /// Idempotency key -> job currently queued or processing under it
    active: Arc<Mutex<HashMap<String, JobId>>>,
    capacity: usize,
}

/// Consumer side of the job queue, owned by the executor.
pub struct JobReceiver {
    rx: mpsc::Receiver<HighlightJob>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let queue = Self {
            tx,
            active: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        };
        (queue, JobReceiver { rx })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue a job without waiting for room.
    ///
    /// Rejected when another active job has the same idempotency key, or
    /// when the queue is full or closed.
    pub async fn enqueue(&self, job: HighlightJob) -> QueueResult<JobId> {
        let key = job.idempotency_key();
        let job_id = job.id.clone();

        let mut active = self.active.lock().await;
        if let Some(existing) = active.get(&key) {
            warn!("Duplicate job rejected: {}", key);
            return Err(QueueError::Duplicate {
                key,
                existing: existing.clone(),
            });
        }

        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => QueueError::QueueClosed,
        })?;

        active.insert(key, job_id.clone());
        info!(job_id = %job_id, "Enqueued highlight job");
        Ok(job_id)
    }

    /// Forget the idempotency key of a finished job so it can be resubmitted.
    pub async fn release(&self, job: &HighlightJob) {
        let key = job.idempotency_key();
        let mut active = self.active.lock().await;
        if active.get(&key) == Some(&job.id) {
            active.remove(&key);
            debug!(job_id = %job.id, "Released idempotency key");
        }
    }

    /// Number of jobs queued or processing.
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl JobReceiver {
    /// Wait for the next job. `None` once every producer is dropped or the
    /// receiver is closed and drained.
    pub async fn recv(&mut self) -> Option<HighlightJob> {
        self.rx.recv().await
    }

    /// Stop accepting new jobs; queued jobs can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
