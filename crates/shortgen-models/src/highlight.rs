//! Highlight models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tier of the selection cascade that produced a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HighlightSource {
    /// Ranked by merged sentiment/intensity score
    Merged,
    /// Taken from the raw scene list
    Scene,
    /// Uniform time slicing
    Uniform,
}

impl HighlightSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightSource::Merged => "merged",
            HighlightSource::Scene => "scene",
            HighlightSource::Uniform => "uniform",
        }
    }
}

impl std::fmt::Display for HighlightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selected, duration-normalized window destined to become a clip.
///
/// The selector only emits highlights with
/// `0 <= start_time < end_time <= total_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Highlight {
    /// Start in seconds
    pub start_time: f64,
    /// End in seconds
    pub end_time: f64,
    /// Which tier produced it
    pub source: HighlightSource,
}

impl Highlight {
    pub fn new(start_time: f64, end_time: f64, source: HighlightSource) -> Self {
        Self {
            start_time,
            end_time,
            source,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether the window is non-degenerate and inside `[0, total_duration]`.
    pub fn is_valid(&self, total_duration: f64) -> bool {
        self.start_time >= 0.0 && self.start_time < self.end_time && self.end_time <= total_duration
    }
}

/// Target clip length range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DurationBounds {
    pub min: f64,
    pub max: f64,
}

impl DurationBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether a length already falls within the bounds.
    pub fn contains(&self, duration: f64) -> bool {
        duration >= self.min && duration <= self.max
    }
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 30.0,
        }
    }
}

/// Per-clip entry of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightMetadata {
    /// Clip file name inside the job folder
    pub filename: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub source: HighlightSource,

    /// Remote video ID after a successful upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,

    /// Watch URL after a successful upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,

    /// Upload error, if the upload was attempted and failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_error: Option<String>,
}

impl HighlightMetadata {
    /// Build the entry for the `index`-th clip (0-based).
    pub fn for_clip(index: usize, highlight: &Highlight) -> Self {
        Self {
            filename: format!("highlight_{}.mp4", index + 1),
            start_time: highlight.start_time,
            end_time: highlight.end_time,
            duration: highlight.duration(),
            source: highlight.source,
            youtube_id: None,
            youtube_url: None,
            youtube_error: None,
        }
    }

    /// Record a successful upload.
    pub fn record_upload(&mut self, remote_id: impl Into<String>) {
        let remote_id = remote_id.into();
        self.youtube_url = Some(format!("https://www.youtube.com/watch?v={}", remote_id));
        self.youtube_id = Some(remote_id);
        self.youtube_error = None;
    }

    /// Record a failed upload.
    pub fn record_upload_error(&mut self, error: impl Into<String>) {
        self.youtube_error = Some(error.into());
    }
}

/// Contents of a job's `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobMetadata {
    /// File name of the source video
    pub original_video: String,
    pub total_duration: f64,
    pub has_audio: bool,
    pub highlights: Vec<HighlightMetadata>,
    pub transcript: Option<String>,
}
