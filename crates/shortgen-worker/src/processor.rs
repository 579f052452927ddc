//! The highlight pipeline for one job.
//!
//! Stages and the progress reported after each:
//!
//! | progress | stage |
//! |----------|-------|
//! | 10 | started |
//! | 20 | probed |
//! | 40 | audio extracted |
//! | 60 | transcribed and sentiment-scored |
//! | 70 | scenes detected and intensity-scored |
//! | 80 | highlights selected |
//! | 80-100 | one step per clip cut |
//!
//! Transcription, scene detection and intensity scoring are best effort: a
//! failure is logged and the job continues without that signal. Probing,
//! cutting and metadata persistence failures fail the job. Upload failures
//! are recorded per clip in the metadata.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, Instrument};

use shortgen_models::{
    DetectedScene, HighlightJob, HighlightMetadata, JobId, JobMetadata, RawScene, ScoredSegment,
};
use shortgen_queue::{JobStore, ProgressChannel};
use shortgen_scoring::{merge_with, select};

use crate::collaborators::{CancelSignal, Collaborators, UploadRequest};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metadata::{write_metadata, write_transcript};
use crate::metrics;

/// Shared state for every job run by a worker.
#[derive(Clone)]
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub store: JobStore,
    pub progress: ProgressChannel,
    pub collaborators: Collaborators,
}

impl ProcessingContext {
    pub fn new(
        config: WorkerConfig,
        store: JobStore,
        progress: ProgressChannel,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config,
            store,
            progress,
            collaborators,
        }
    }

    /// Folder receiving the clips and metadata of `job_id`.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.config.results_dir.join(job_id.as_str())
    }

    fn work_dir(&self, job_id: &JobId) -> PathBuf {
        self.config.work_dir.join(job_id.as_str())
    }

    /// Publish progress and record it in the store.
    ///
    /// A store rejection means the job left `processing` (cancelled); the
    /// pipeline notices that through its cancel signal.
    async fn report(&self, job_id: &JobId, value: u8, step: &str) {
        if let Err(e) = self
            .store
            .update_progress(job_id, value, Some(step.to_string()))
            .await
        {
            debug!(job_id = %job_id, "Progress not recorded: {}", e);
        }
        self.progress.progress(job_id, value);
        self.progress.log(job_id, step);
    }
}

/// What a finished pipeline produced.
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// Clip files in highlight order
    pub result_files: Vec<PathBuf>,
    pub metadata: JobMetadata,
}

/// Run the pipeline for `job`. The work directory is removed afterwards
/// whatever the outcome.
pub async fn process_job(
    ctx: &ProcessingContext,
    job: &HighlightJob,
    cancel: &CancelSignal,
) -> WorkerResult<JobOutput> {
    let logger = JobLogger::new(&job.id, "highlights");
    let span = logger.create_span();

    let work_dir = ctx.work_dir(&job.id);
    let result = run_pipeline(ctx, job, cancel, &logger, &work_dir)
        .instrument(span)
        .await;

    if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            logger.log_warning(&format!("Failed to remove {}: {}", work_dir.display(), e));
        }
    }

    result
}

async fn run_pipeline(
    ctx: &ProcessingContext,
    job: &HighlightJob,
    cancel: &CancelSignal,
    logger: &JobLogger,
    work_dir: &Path,
) -> WorkerResult<JobOutput> {
    let c = &ctx.collaborators;
    let video = job.video_path.as_path();
    let video_name = job.video_file_name();
    let job_dir = ctx.job_dir(&job.id);

    logger.log_start(&video_name);
    ctx.report(&job.id, 10, "Processing started").await;

    if !video.exists() {
        return Err(WorkerError::processing_failed(format!(
            "video not found: {}",
            video.display()
        )));
    }
    tokio::fs::create_dir_all(&job_dir).await?;
    tokio::fs::create_dir_all(work_dir).await?;

    // Probe
    let stage = Instant::now();
    let info = c.media.probe(video).await?;
    metrics::record_stage_duration("probe", stage.elapsed().as_secs_f64());
    logger.log_progress(&format!(
        "Duration {:.2}s, audio: {}",
        info.duration, info.has_audio
    ));
    ctx.report(&job.id, 20, "Video loaded").await;
    ensure_not_cancelled(cancel)?;

    // Audio, transcript and sentiment
    let (transcript, sentiment) = if info.has_audio {
        transcribe(ctx, job, cancel, logger, work_dir, &job_dir).await?
    } else {
        logger.log_progress("No audio track, skipping transcription");
        (None, Vec::new())
    };
    ctx.report(&job.id, 60, "Transcription finished").await;
    ensure_not_cancelled(cancel)?;

    // Scenes and intensity
    let stage = Instant::now();
    let scenes: Option<Vec<DetectedScene>> = match c.scenes.detect(video, work_dir).await {
        Ok(scenes) => {
            logger.log_progress(&format!("Detected {} scenes", scenes.len()));
            Some(scenes)
        }
        Err(e) => {
            logger.log_warning(&format!("Scene detection failed: {}", e));
            None
        }
    };
    ensure_not_cancelled(cancel)?;

    let intensity: Vec<ScoredSegment> = match scenes.as_deref() {
        Some(list) if !list.is_empty() => {
            match c.intensity.score(video, list, work_dir, cancel).await {
                Ok(scored) => scored,
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    logger.log_warning(&format!("Intensity scoring failed: {}", e));
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };
    metrics::record_stage_duration("scenes", stage.elapsed().as_secs_f64());
    ctx.report(&job.id, 70, "Scene analysis finished").await;
    ensure_not_cancelled(cancel)?;

    // Selection
    let raw_scenes: Option<Vec<RawScene>> = scenes
        .as_ref()
        .map(|list| list.iter().map(DetectedScene::to_raw).collect());
    let merged = merge_with(&sentiment, &intensity, job.weights, job.merge_strategy);
    let highlights = select(
        &merged,
        raw_scenes.as_deref(),
        info.duration,
        job.num_highlights,
        job.duration_bounds,
    );
    for h in &highlights {
        metrics::record_highlight(h.source);
    }
    if highlights.len() < job.num_highlights {
        logger.log_warning(&format!(
            "Only {} of {} highlights fit in {:.2}s",
            highlights.len(),
            job.num_highlights,
            info.duration
        ));
    }
    ctx.report(&job.id, 80, "Highlights selected").await;

    // Clips
    let stage = Instant::now();
    let total = highlights.len();
    let mut result_files = Vec::with_capacity(total);
    let mut clips = Vec::with_capacity(total);
    for (i, highlight) in highlights.iter().enumerate() {
        ensure_not_cancelled(cancel)?;

        let entry = HighlightMetadata::for_clip(i, highlight);
        let output = job_dir.join(&entry.filename);
        logger.log_progress(&format!(
            "Creating highlight {} from {:.2}s to {:.2}s",
            i + 1,
            highlight.start_time,
            highlight.end_time
        ));

        c.media
            .cut_clip(video, &output, highlight, info.has_audio, cancel)
            .await?;

        ctx.progress.highlight_cut(&job.id, i, total, &entry.filename);
        let value = 80 + ((i + 1) * 20 / total) as u8;
        ctx.report(&job.id, value, &format!("Created highlight {} of {}", i + 1, total))
            .await;

        result_files.push(output);
        clips.push(entry);
    }
    metrics::record_stage_duration("cut", stage.elapsed().as_secs_f64());

    let mut metadata = JobMetadata {
        original_video: video_name.clone(),
        total_duration: info.duration,
        has_audio: info.has_audio,
        highlights: clips,
        transcript,
    };
    write_metadata(&job_dir, &metadata).await?;

    // Uploads
    if job.upload && !result_files.is_empty() {
        match &c.uploader {
            Some(uploader) => {
                for (i, (file, entry)) in result_files
                    .iter()
                    .zip(metadata.highlights.iter_mut())
                    .enumerate()
                {
                    ensure_not_cancelled(cancel)?;
                    let request =
                        UploadRequest::for_highlight(i, &video_name, &ctx.config.youtube.privacy);
                    match uploader.upload(file, &request).await {
                        Ok(receipt) => {
                            logger.log_progress(&format!(
                                "Uploaded highlight {} as {} ({})",
                                i + 1,
                                receipt.remote_id,
                                receipt.status
                            ));
                            entry.record_upload(receipt.remote_id);
                            metrics::record_upload(true);
                        }
                        Err(e) => {
                            logger.log_error(&format!("Upload of highlight {} failed: {}", i + 1, e));
                            entry.record_upload_error(e.to_string());
                            metrics::record_upload(false);
                        }
                    }
                }
                write_metadata(&job_dir, &metadata).await?;
            }
            None => logger.log_warning("Upload requested but no uploader is configured"),
        }
    }

    logger.log_completion(&format!("{} highlights", result_files.len()));
    Ok(JobOutput {
        result_files,
        metadata,
    })
}

/// Extract audio, transcribe and score lines.
///
/// Only cancellation is an error here; anything else leaves the job without
/// a transcript.
async fn transcribe(
    ctx: &ProcessingContext,
    job: &HighlightJob,
    cancel: &CancelSignal,
    logger: &JobLogger,
    work_dir: &Path,
    job_dir: &Path,
) -> WorkerResult<(Option<String>, Vec<ScoredSegment>)> {
    let c = &ctx.collaborators;
    let audio = work_dir.join("audio.wav");
    let stage = Instant::now();

    let outcome = match c.media.extract_audio(&job.video_path, &audio, cancel).await {
        Ok(()) => {
            ctx.report(&job.id, 40, "Audio extracted").await;
            ensure_not_cancelled(cancel)?;
            match c.transcriber.transcribe(&audio, work_dir).await {
                Ok(text) if text.trim().is_empty() => {
                    logger.log_warning("Transcript is empty");
                    (None, Vec::new())
                }
                Ok(text) => {
                    if let Err(e) = write_transcript(job_dir, &text).await {
                        logger.log_warning(&format!("Failed to save transcript: {}", e));
                    }
                    let sentiment = c.sentiment.analyze(&text);
                    logger.log_progress(&format!("Scored {} transcript lines", sentiment.len()));
                    (Some(text), sentiment)
                }
                Err(e) => {
                    logger.log_warning(&format!("Transcription failed: {}", e));
                    (None, Vec::new())
                }
            }
        }
        Err(e) if e.is_cancellation() => return Err(e),
        Err(e) => {
            logger.log_warning(&format!("Audio extraction failed: {}", e));
            (None, Vec::new())
        }
    };

    if let Err(e) = tokio::fs::remove_file(&audio).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            logger.log_warning(&format!("Failed to remove {}: {}", audio.display(), e));
        }
    }
    metrics::record_stage_duration("transcribe", stage.elapsed().as_secs_f64());
    Ok(outcome)
}

fn ensure_not_cancelled(cancel: &CancelSignal) -> WorkerResult<()> {
    if *cancel.borrow() {
        Err(WorkerError::Cancelled)
    } else {
        Ok(())
    }
}
