//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shortgen_models::{DurationBounds, HighlightJob, MergeStrategy, ScoreWeights};

use crate::error::{WorkerError, WorkerResult};

/// Default YouTube resumable/multipart upload endpoint.
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com";

/// Upper bound on highlights per job.
pub const MAX_HIGHLIGHTS: usize = 100;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Maximum pending jobs in the queue
    pub queue_capacity: usize,
    /// Folder receiving one sub-folder of clips per job
    pub results_dir: PathBuf,
    /// Work directory for temporary files
    pub work_dir: PathBuf,
    /// Highlights per job unless the job says otherwise
    pub num_highlights: usize,
    pub duration_bounds: DurationBounds,
    pub weights: ScoreWeights,
    pub merge_strategy: MergeStrategy,
    /// `detect-content` threshold
    pub scene_threshold: f64,
    /// Scenes kept by the intensity scorer
    pub top_scenes: usize,
    /// Lines kept by the sentiment scorer
    pub top_lines: usize,
    /// Seconds assumed per transcript line
    pub line_interval: f64,
    pub whisper_model: String,
    /// Job timeout
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Age after which finished jobs are cleaned up
    pub job_retention: Duration,
    pub youtube: YoutubeConfig,
    /// Prometheus listen address
    pub metrics_addr: Option<String>,
}

/// Upload settings. Uploading is disabled without an access token.
#[derive(Clone)]
pub struct YoutubeConfig {
    pub access_token: Option<String>,
    pub privacy: String,
    pub api_base: String,
}

impl std::fmt::Debug for YoutubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("privacy", &self.privacy)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            privacy: "unlisted".to_string(),
            api_base: DEFAULT_YOUTUBE_API_BASE.to_string(),
        }
    }
}

impl YoutubeConfig {
    pub fn is_enabled(&self) -> bool {
        self.access_token.as_deref().map_or(false, |t| !t.is_empty())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_capacity: 32,
            results_dir: PathBuf::from("results"),
            work_dir: PathBuf::from("temp"),
            num_highlights: 3,
            duration_bounds: DurationBounds::default(),
            weights: ScoreWeights::default(),
            merge_strategy: MergeStrategy::Exact,
            scene_threshold: 30.0,
            top_scenes: 5,
            top_lines: 5,
            line_interval: 10.0,
            whisper_model: "base".to_string(),
            job_timeout: Duration::from_secs(3600), // 1 hour
            shutdown_timeout: Duration::from_secs(30),
            job_retention: Duration::from_secs(86_400),
            youtube: YoutubeConfig::default(),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let merge_strategy = std::env::var("SHORTGEN_MERGE_STRATEGY")
            .ok()
            .and_then(|s| MergeStrategy::from_name(&s))
            .unwrap_or(defaults.merge_strategy);

        Self {
            max_concurrent_jobs: env_or("SHORTGEN_MAX_JOBS", defaults.max_concurrent_jobs).max(1),
            queue_capacity: env_or("SHORTGEN_QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            results_dir: env_or("SHORTGEN_RESULTS_DIR", defaults.results_dir),
            work_dir: env_or("SHORTGEN_WORK_DIR", defaults.work_dir),
            num_highlights: env_or("SHORTGEN_NUM_HIGHLIGHTS", defaults.num_highlights),
            duration_bounds: DurationBounds::new(
                env_or("SHORTGEN_MIN_DURATION", defaults.duration_bounds.min),
                env_or("SHORTGEN_MAX_DURATION", defaults.duration_bounds.max),
            ),
            weights: ScoreWeights::new(
                env_or("SHORTGEN_WEIGHT_SENTIMENT", defaults.weights.sentiment),
                env_or("SHORTGEN_WEIGHT_INTENSITY", defaults.weights.intensity),
            ),
            merge_strategy,
            scene_threshold: env_or("SHORTGEN_SCENE_THRESHOLD", defaults.scene_threshold),
            top_scenes: env_or("SHORTGEN_TOP_SCENES", defaults.top_scenes),
            top_lines: env_or("SHORTGEN_TOP_LINES", defaults.top_lines),
            line_interval: env_or("SHORTGEN_LINE_INTERVAL", defaults.line_interval),
            whisper_model: env_or("SHORTGEN_WHISPER_MODEL", defaults.whisper_model),
            job_timeout: Duration::from_secs(env_or("SHORTGEN_JOB_TIMEOUT", 3600)),
            shutdown_timeout: Duration::from_secs(env_or("SHORTGEN_SHUTDOWN_TIMEOUT", 30)),
            job_retention: Duration::from_secs(env_or("SHORTGEN_JOB_RETENTION", 86_400)),
            youtube: YoutubeConfig {
                access_token: std::env::var("YOUTUBE_ACCESS_TOKEN")
                    .ok()
                    .filter(|t| !t.is_empty()),
                privacy: std::env::var("YOUTUBE_PRIVACY")
                    .ok()
                    .filter(|p| matches!(p.as_str(), "public" | "private" | "unlisted"))
                    .unwrap_or_else(|| "unlisted".to_string()),
                api_base: env_or("YOUTUBE_API_BASE", DEFAULT_YOUTUBE_API_BASE.to_string()),
            },
            metrics_addr: std::env::var("METRICS_ADDR").ok().filter(|a| !a.is_empty()),
        }
    }

    /// Reject settings no job could run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.num_highlights > MAX_HIGHLIGHTS {
            return Err(WorkerError::config_error(format!(
                "highlight count {} exceeds the maximum of {}",
                self.num_highlights, MAX_HIGHLIGHTS
            )));
        }
        let bounds = self.duration_bounds;
        if !(bounds.min > 0.0) || !bounds.max.is_finite() {
            return Err(WorkerError::config_error(format!(
                "invalid clip length range {}..{}",
                bounds.min, bounds.max
            )));
        }
        if bounds.min > bounds.max {
            return Err(WorkerError::config_error(format!(
                "minimum clip length ({}) exceeds maximum ({})",
                bounds.min, bounds.max
            )));
        }
        Ok(())
    }

    /// A job for `video_path` carrying this config's defaults.
    pub fn job_for(&self, video_path: impl Into<PathBuf>) -> HighlightJob {
        HighlightJob::new(video_path, self.num_highlights)
            .with_duration_bounds(self.duration_bounds)
            .with_weights(self.weights)
            .with_merge_strategy(self.merge_strategy)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
