//! Progress events over a tokio broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use shortgen_models::JobId;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressKind {
    Log { message: String },
    Progress { value: u8 },
    HighlightCut { index: usize, total: usize, filename: String },
    Done { clips: usize },
    Error { message: String },
}

/// Progress event for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub kind: ProgressKind,
}

impl ProgressEvent {
    /// Whether no further events follow for this job.
    pub fn is_final(&self) -> bool {
        matches!(self.kind, ProgressKind::Done { .. } | ProgressKind::Error { .. })
    }
}

/// Channel for publishing/subscribing to progress events.
///
/// Publishing never blocks; a subscriber that falls more than `capacity`
/// events behind skips the oldest ones.
#[derive(Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns the number of subscribers that received it.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        // No subscribers is not an error.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn log(&self, job_id: &JobId, message: impl Into<String>) -> usize {
        self.emit(job_id, ProgressKind::Log {
            message: message.into(),
        })
    }

    pub fn progress(&self, job_id: &JobId, value: u8) -> usize {
        self.emit(job_id, ProgressKind::Progress {
            value: value.min(100),
        })
    }

    /// A highlight clip was written (`index` is zero-based).
    pub fn highlight_cut(
        &self,
        job_id: &JobId,
        index: usize,
        total: usize,
        filename: impl Into<String>,
    ) -> usize {
        self.emit(job_id, ProgressKind::HighlightCut {
            index,
            total,
            filename: filename.into(),
        })
    }

    pub fn done(&self, job_id: &JobId, clips: usize) -> usize {
        self.emit(job_id, ProgressKind::Done { clips })
    }

    pub fn error(&self, job_id: &JobId, message: impl Into<String>) -> usize {
        self.emit(job_id, ProgressKind::Error {
            message: message.into(),
        })
    }

    /// Receive events for every job.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Receive events for one job only.
    pub fn subscribe_job(&self, job_id: &JobId) -> JobSubscription {
        JobSubscription {
            job_id: job_id.clone(),
            rx: self.tx.subscribe(),
        }
    }

    fn emit(&self, job_id: &JobId, kind: ProgressKind) -> usize {
        debug!(job_id = %job_id, ?kind, "Publishing progress event");
        self.publish(ProgressEvent {
            job_id: job_id.clone(),
            kind,
        })
    }
}

/// Filtered view of the progress channel.
pub struct JobSubscription {
    job_id: JobId,
    rx: broadcast::Receiver<ProgressEvent>,
}

impl JobSubscription {
    /// Next event for the job; `None` when the channel is closed.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.job_id == self.job_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(job_id = %self.job_id, skipped, "Progress subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
