//! Shared data models for the ShortGen highlight pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Scored and merged time segments
//! - Raw and detected scenes
//! - Highlights and the duration bounds they are normalized to
//! - Highlight jobs, their status and persisted metadata

pub mod highlight;
pub mod job;
pub mod job_status;
pub mod segment;

// Re-export common types
pub use highlight::{DurationBounds, Highlight, HighlightMetadata, HighlightSource, JobMetadata};
pub use job::{HighlightJob, JobId, MergeStrategy, ScoreWeights};
pub use job_status::{JobRecord, JobStatus};
pub use segment::{DetectedScene, MergedSegment, RawScene, ScoredSegment};
