//! Fake collaborators and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use shortgen_media::{MediaError, VideoInfo};
use shortgen_models::{DetectedScene, Highlight, HighlightJob, JobRecord, JobStatus, ScoredSegment};
use shortgen_queue::{JobStore, ProgressChannel};
use shortgen_worker::collaborators::CancelSignal;
use shortgen_worker::{
    Collaborators, IntensityScorer, MediaTools, ProcessingContext, SceneDetector,
    SentimentAnalyzer, Transcriber, UploadReceipt, UploadRequest, Uploader, WorkerConfig,
    WorkerError, WorkerResult,
};

pub fn video_info(duration: f64, has_audio: bool) -> VideoInfo {
    VideoInfo {
        duration,
        width: 1920,
        height: 1080,
        fps: 30.0,
        has_audio,
    }
}

async fn cancelled(mut cancel: CancelSignal) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

/// Writes placeholder files instead of running ffmpeg.
pub struct FakeMedia {
    pub info: VideoInfo,
    pub fail_probe: bool,
    pub fail_audio: bool,
    /// How long each cut takes; cancellable
    pub cut_delay: Duration,
    /// `(highlight, with_audio)` per cut
    pub cuts: Mutex<Vec<(Highlight, bool)>>,
}

impl FakeMedia {
    pub fn new(info: VideoInfo) -> Self {
        Self {
            info,
            fail_probe: false,
            fail_audio: false,
            cut_delay: Duration::ZERO,
            cuts: Mutex::new(Vec::new()),
        }
    }

    pub fn cuts(&self) -> Vec<(Highlight, bool)> {
        self.cuts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTools for FakeMedia {
    async fn probe(&self, _video: &Path) -> WorkerResult<VideoInfo> {
        if self.fail_probe {
            return Err(MediaError::InvalidVideo("no video stream".into()).into());
        }
        Ok(self.info.clone())
    }

    async fn extract_audio(
        &self,
        _video: &Path,
        output: &Path,
        _cancel: &CancelSignal,
    ) -> WorkerResult<()> {
        if self.fail_audio {
            return Err(MediaError::FfmpegFailed {
                message: "exit status 1".into(),
                stderr: None,
                exit_code: Some(1),
            }
            .into());
        }
        tokio::fs::write(output, b"RIFF").await?;
        Ok(())
    }

    async fn cut_clip(
        &self,
        _video: &Path,
        output: &Path,
        highlight: &Highlight,
        with_audio: bool,
        cancel: &CancelSignal,
    ) -> WorkerResult<()> {
        if !self.cut_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.cut_delay) => {}
                _ = cancelled(cancel.clone()) => return Err(MediaError::Cancelled.into()),
            }
        }
        tokio::fs::write(output, b"mp4").await?;
        self.cuts.lock().unwrap().push((*highlight, with_audio));
        Ok(())
    }
}

pub struct FakeTranscriber {
    pub result: Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &Path, _work_dir: &Path) -> WorkerResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio.exists(), "audio should be extracted before transcription");
        self.result
            .clone()
            .map_err(WorkerError::transcription_failed)
    }
}

pub struct FakeSentiment(pub Vec<ScoredSegment>);

impl SentimentAnalyzer for FakeSentiment {
    fn analyze(&self, _transcript: &str) -> Vec<ScoredSegment> {
        self.0.clone()
    }
}

pub struct FakeScenes(pub Option<Vec<DetectedScene>>);

#[async_trait]
impl SceneDetector for FakeScenes {
    async fn detect(&self, _video: &Path, _work_dir: &Path) -> WorkerResult<Vec<DetectedScene>> {
        self.0
            .clone()
            .ok_or_else(|| WorkerError::scene_analysis_failed("scenedetect exited with 1"))
    }
}

pub struct FakeIntensity {
    pub scores: Vec<ScoredSegment>,
    /// How long scoring takes; cancellable
    pub delay: Duration,
}

#[async_trait]
impl IntensityScorer for FakeIntensity {
    async fn score(
        &self,
        _video: &Path,
        _scenes: &[DetectedScene],
        _work_dir: &Path,
        cancel: &CancelSignal,
    ) -> WorkerResult<Vec<ScoredSegment>> {
        if !self.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = cancelled(cancel.clone()) => return Err(WorkerError::Cancelled),
            }
        }
        if *cancel.borrow() {
            return Err(WorkerError::Cancelled);
        }
        Ok(self.scores.clone())
    }
}

/// Records requests; the call numbered `fail_call` (1-based) is rejected.
#[derive(Default)]
pub struct FakeUploader {
    pub fail_call: Option<usize>,
    pub requests: Mutex<Vec<UploadRequest>>,
}

impl FakeUploader {
    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(&self, clip: &Path, request: &UploadRequest) -> WorkerResult<UploadReceipt> {
        assert!(clip.exists(), "clip should exist before upload");
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_call == Some(call) {
            return Err(WorkerError::upload_rejected("403 Forbidden: quotaExceeded"));
        }
        Ok(UploadReceipt {
            remote_id: format!("vid{}", call),
            status: "uploaded".into(),
        })
    }
}

/// Typed handles to the fakes next to the erased [`Collaborators`].
pub struct Fakes {
    pub media: Arc<FakeMedia>,
    pub transcriber: Arc<FakeTranscriber>,
    pub sentiment: Vec<ScoredSegment>,
    pub scenes: Option<Vec<DetectedScene>>,
    pub intensity: Vec<ScoredSegment>,
    pub intensity_delay: Duration,
    pub uploader: Option<Arc<FakeUploader>>,
}

impl Fakes {
    /// Five-minute talk with speech, two scored lines and three scenes.
    pub fn talk() -> Self {
        Self {
            media: Arc::new(FakeMedia::new(video_info(300.0, true))),
            transcriber: Arc::new(FakeTranscriber::ok("Great start. Boring bit. Big finish!")),
            sentiment: vec![
                ScoredSegment::new(100.0, 110.0, 0.9),
                ScoredSegment::new(200.0, 210.0, -0.5),
            ],
            scenes: Some(vec![
                DetectedScene::new(1, 0.0, 50.0),
                DetectedScene::new(2, 50.0, 60.0),
                DetectedScene::new(3, 60.0, 300.0),
            ]),
            intensity: vec![
                ScoredSegment::new(100.0, 110.0, 40.0),
                ScoredSegment::new(50.0, 60.0, 10.0),
            ],
            intensity_delay: Duration::ZERO,
            uploader: None,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            media: self.media.clone(),
            transcriber: self.transcriber.clone(),
            sentiment: Arc::new(FakeSentiment(self.sentiment.clone())),
            scenes: Arc::new(FakeScenes(self.scenes.clone())),
            intensity: Arc::new(FakeIntensity {
                scores: self.intensity.clone(),
                delay: self.intensity_delay,
            }),
            uploader: self
                .uploader
                .clone()
                .map(|u| u as Arc<dyn Uploader>),
        }
    }
}

/// Temp directories plus a placeholder source video.
pub struct Fixture {
    pub dir: TempDir,
    pub video: PathBuf,
    pub config: WorkerConfig,
    pub store: JobStore,
    pub progress: ProgressChannel,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"not really a video").unwrap();

        let config = WorkerConfig {
            results_dir: dir.path().join("results"),
            work_dir: dir.path().join("work"),
            ..Default::default()
        };

        Self {
            dir,
            video,
            config,
            store: JobStore::new(),
            progress: ProgressChannel::new(1024),
        }
    }

    /// Another source video in the fixture directory.
    pub fn extra_video(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }

    pub fn context(&self, fakes: &Fakes) -> ProcessingContext {
        ProcessingContext::new(
            self.config.clone(),
            self.store.clone(),
            self.progress.clone(),
            fakes.collaborators(),
        )
    }

    pub fn job(&self) -> HighlightJob {
        self.config.job_for(&self.video)
    }

    /// Record `job` as already picked up by a worker.
    pub async fn start(&self, job: &HighlightJob) {
        self.store
            .insert(JobRecord::new(job.id.clone(), job.video_file_name()))
            .await
            .unwrap();
        self.store
            .transition(&job.id, JobStatus::Queued, JobStatus::Processing)
            .await
            .unwrap();
    }
}

pub fn windows(highlights: &[Highlight]) -> Vec<(f64, f64)> {
    highlights.iter().map(|h| (h.start_time, h.end_time)).collect()
}
