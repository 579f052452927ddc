//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Scene analysis failed: {0}")]
    SceneAnalysisFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Media error: {0}")]
    Media(#[from] shortgen_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] shortgen_queue::QueueError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn transcription_failed(msg: impl Into<String>) -> Self {
        Self::TranscriptionFailed(msg.into())
    }

    pub fn scene_analysis_failed(msg: impl Into<String>) -> Self {
        Self::SceneAnalysisFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn upload_rejected(msg: impl Into<String>) -> Self {
        Self::UploadRejected(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::UploadFailed(_) => true,
            WorkerError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .map_or(false, |s| s.is_server_error() || s.as_u16() == 429)
            }
            _ => false,
        }
    }

    /// Whether the job stopped because it was cancelled rather than failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            WorkerError::Cancelled | WorkerError::Media(shortgen_media::MediaError::Cancelled)
        )
    }
}
