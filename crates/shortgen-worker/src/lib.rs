//! Highlight generation worker.
//!
//! This crate provides:
//! - The per-job pipeline (probe, transcribe, score, select, cut, upload)
//! - Collaborator traits with ffmpeg/whisper/scenedetect/YouTube backends
//! - A bounded-concurrency job executor with cancellation and shutdown
//! - Config, logging, metrics and retention cleanup

pub mod cleanup;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod processor;
pub mod retry;

pub use cleanup::cleanup_old_jobs;
pub use collaborators::{
    CancelSignal, Collaborators, IntensityScorer, MediaTools, SceneDetector, SentimentAnalyzer,
    Transcriber, UploadReceipt, UploadRequest, Uploader,
};
pub use config::{WorkerConfig, YoutubeConfig, MAX_HIGHLIGHTS};
pub use error::{WorkerError, WorkerResult};
pub use executor::{ExecutorHandle, JobExecutor};
pub use logging::{init_tracing, JobLogger};
pub use processor::{process_job, JobOutput, ProcessingContext};
