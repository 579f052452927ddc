//! Highlight job definitions.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DurationBounds;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relative weights of the two signals in the combined score.
///
/// Weights are not required to sum to 1 and are not range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreWeights {
    pub sentiment: f64,
    pub intensity: f64,
}

impl ScoreWeights {
    pub fn new(sentiment: f64, intensity: f64) -> Self {
        Self {
            sentiment,
            intensity,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            sentiment: 0.4,
            intensity: 0.6,
        }
    }
}

/// How sentiment and intensity segments are aligned before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MergeStrategy {
    /// Join on the literal `(start_time, end_time)` pair.
    #[default]
    Exact,
    /// Fold an intensity segment into the sentiment segment it overlaps best,
    /// provided their intersection-over-union reaches `min_iou`.
    Overlap { min_iou: f64 },
}

impl MergeStrategy {
    /// Default IoU threshold used when the overlap strategy is picked by name.
    pub const DEFAULT_MIN_IOU: f64 = 0.3;

    /// Parse `exact` or `overlap` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "exact" => Some(MergeStrategy::Exact),
            "overlap" => Some(MergeStrategy::Overlap {
                min_iou: Self::DEFAULT_MIN_IOU,
            }),
            _ => None,
        }
    }
}

/// A request to generate highlights for one video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HighlightJob {
    /// Unique job ID
    pub id: JobId,

    /// Local path of the uploaded video
    pub video_path: PathBuf,

    /// Requested number of highlights
    pub num_highlights: usize,

    /// Clip length range
    #[serde(default)]
    pub duration_bounds: DurationBounds,

    /// Signal weights
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Segment alignment strategy
    #[serde(default)]
    pub merge_strategy: MergeStrategy,

    /// Whether finished clips are republished
    #[serde(default)]
    pub upload: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl HighlightJob {
    /// Create a job with default weights and bounds.
    pub fn new(video_path: impl Into<PathBuf>, num_highlights: usize) -> Self {
        Self {
            id: JobId::new(),
            video_path: video_path.into(),
            num_highlights,
            duration_bounds: DurationBounds::default(),
            weights: ScoreWeights::default(),
            merge_strategy: MergeStrategy::default(),
            upload: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_duration_bounds(mut self, bounds: DurationBounds) -> Self {
        self.duration_bounds = bounds;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    pub fn with_upload(mut self, upload: bool) -> Self {
        self.upload = upload;
        self
    }

    /// File name of the source video, used in titles and metadata.
    pub fn video_file_name(&self) -> String {
        self.video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.video_path.to_string_lossy().to_string())
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!(
            "highlights:{}:{}:{}-{}",
            self.video_path.display(),
            self.num_highlights,
            self.duration_bounds.min,
            self.duration_bounds.max
        )
    }
}
