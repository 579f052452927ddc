//! External collaborators of the highlight pipeline.
//!
//! Everything the pipeline does not compute itself sits behind a trait here:
//! media tooling, speech-to-text, line sentiment, scene detection, scene
//! intensity and publishing. [`Collaborators::from_config`] wires the CLI and
//! HTTP backed defaults; tests swap in fakes.

mod intensity;
mod media;
mod scenes;
mod sentiment;
mod transcribe;
mod youtube;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use shortgen_media::VideoInfo;
use shortgen_models::{DetectedScene, Highlight, ScoredSegment};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

pub use intensity::{frame_intensity, FrameIntensity};
pub use media::FfmpegMedia;
pub use scenes::SceneDetectCli;
pub use sentiment::{LexiconSentiment, LineSentiment};
pub use transcribe::WhisperCli;
pub use youtube::YoutubeUploader;

/// Cancellation signal handed to long-running collaborator calls.
pub type CancelSignal = watch::Receiver<bool>;

/// Probing, audio extraction and clip cutting.
#[async_trait]
pub trait MediaTools: Send + Sync {
    async fn probe(&self, video: &Path) -> WorkerResult<VideoInfo>;

    /// Write the audio track of `video` to `output` as speech-ready WAV.
    async fn extract_audio(&self, video: &Path, output: &Path, cancel: &CancelSignal)
        -> WorkerResult<()>;

    /// Cut `highlight` of `video` into `output`.
    async fn cut_clip(
        &self,
        video: &Path,
        output: &Path,
        highlight: &Highlight,
        with_audio: bool,
        cancel: &CancelSignal,
    ) -> WorkerResult<()>;
}

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, work_dir: &Path) -> WorkerResult<String>;
}

/// Scores transcript lines. Timings are heuristic.
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, transcript: &str) -> Vec<ScoredSegment>;
}

/// Finds scene boundaries, in chronological order.
#[async_trait]
pub trait SceneDetector: Send + Sync {
    async fn detect(&self, video: &Path, work_dir: &Path) -> WorkerResult<Vec<DetectedScene>>;
}

/// Scores scenes by visual intensity, returning the top-K only.
#[async_trait]
pub trait IntensityScorer: Send + Sync {
    /// Frame extraction stops once `cancel` fires.
    async fn score(
        &self,
        video: &Path,
        scenes: &[DetectedScene],
        work_dir: &Path,
        cancel: &CancelSignal,
    ) -> WorkerResult<Vec<ScoredSegment>>;
}

/// What to publish a clip as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: String,
}

impl UploadRequest {
    pub const DEFAULT_TAGS: [&'static str; 3] =
        ["AI Generated", "Video Highlights", "Automatic Editing"];

    /// Request for the `index`-th (0-based) highlight of `video_name`.
    pub fn for_highlight(index: usize, video_name: &str, privacy: impl Into<String>) -> Self {
        Self {
            title: format!("Highlight {} - {}", index + 1, video_name),
            description: format!("Automatically generated highlight from {}", video_name),
            tags: Self::DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            privacy: privacy.into(),
        }
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub remote_id: String,
    pub status: String,
}

/// Publishes finished clips.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, clip: &Path, request: &UploadRequest) -> WorkerResult<UploadReceipt>;
}

/// The full set of collaborators a pipeline run uses.
#[derive(Clone)]
pub struct Collaborators {
    pub media: Arc<dyn MediaTools>,
    pub transcriber: Arc<dyn Transcriber>,
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    pub scenes: Arc<dyn SceneDetector>,
    pub intensity: Arc<dyn IntensityScorer>,
    /// `None` disables uploads even for jobs that ask for them
    pub uploader: Option<Arc<dyn Uploader>>,
}

impl Collaborators {
    /// Default CLI and HTTP backed collaborators.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        let uploader: Option<Arc<dyn Uploader>> = if config.youtube.is_enabled() {
            Some(Arc::new(YoutubeUploader::new(&config.youtube)?))
        } else {
            None
        };

        Ok(Self {
            media: Arc::new(FfmpegMedia::default()),
            transcriber: Arc::new(WhisperCli::new(&config.whisper_model)),
            sentiment: Arc::new(
                LexiconSentiment::default()
                    .with_top_k(config.top_lines)
                    .with_line_interval(config.line_interval),
            ),
            scenes: Arc::new(SceneDetectCli::new(config.scene_threshold)),
            intensity: Arc::new(FrameIntensity::new(config.top_scenes)),
            uploader,
        })
    }
}
