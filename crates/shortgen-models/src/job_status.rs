//! Job status records for progress tracking and polling.
//!
//! A [`JobRecord`] is the snapshot kept in the job store for every submitted
//! job. Status changes go through [`JobStatus::can_transition_to`] so that a
//! terminal job is never revived.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{HighlightMetadata, JobId};

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Queued,
    /// Job is actively being processed
    Processing,
    /// Job completed successfully
    Complete,
    /// Job failed with an error
    Failed,
    /// Job was cancelled before completing
    Cancelled,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Legal edges of the status machine.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Queued, Failed)
                | (Queued, Cancelled)
                | (Processing, Complete)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a job kept in the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier
    pub job_id: JobId,
    /// Source video file name
    pub video_name: String,
    /// Current job status
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Current processing step description
    pub current_step: Option<String>,
    /// Error message if job failed
    pub error_message: Option<String>,
    /// Written clip files
    #[serde(default)]
    pub result_files: Vec<PathBuf>,
    /// Per-clip metadata
    #[serde(default)]
    pub metadata: Vec<HighlightMetadata>,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
    /// Sequence number for event ordering (monotonically increasing)
    pub event_seq: u64,
}

impl JobRecord {
    /// Create a new queued record.
    pub fn new(job_id: JobId, video_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            video_name: video_name.into(),
            status: JobStatus::Queued,
            progress: 0,
            current_step: None,
            error_message: None,
            result_files: Vec::new(),
            metadata: Vec::new(),
            created_at: now,
            updated_at: now,
            event_seq: 0,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Update the status and bump the updated_at timestamp.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.touch();
    }

    /// Update progress and bump event sequence. Progress never moves backwards.
    pub fn set_progress(&mut self, progress: u8, step: Option<String>) {
        self.progress = progress.min(100).max(self.progress);
        if step.is_some() {
            self.current_step = step;
        }
        self.touch();
    }

    /// Mark job as complete with its outputs.
    pub fn complete(&mut self, result_files: Vec<PathBuf>, metadata: Vec<HighlightMetadata>) {
        self.status = JobStatus::Complete;
        self.progress = 100;
        self.current_step = Some("Complete".into());
        self.result_files = result_files;
        self.metadata = metadata;
        self.touch();
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.touch();
    }

    /// Mark job as cancelled.
    pub fn cancel(&mut self) {
        self.status = JobStatus::Cancelled;
        self.error_message = Some("Job was cancelled".into());
        self.touch();
    }

    /// Whether the record has not been touched for longer than `max_age`.
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        Utc::now() - self.updated_at > max_age
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.event_seq += 1;
    }
}
