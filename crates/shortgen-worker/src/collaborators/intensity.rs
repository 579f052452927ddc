//! Visual intensity of scenes from a single frame.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use tracing::{debug, warn};

use shortgen_media::{extract_frame, FfmpegRunner};
use shortgen_models::{DetectedScene, ScoredSegment};

use super::{CancelSignal, IntensityScorer};
use crate::error::{WorkerError, WorkerResult};

/// Frames wider than this are downscaled before analysis.
const ANALYSIS_WIDTH: u32 = 320;

/// Frames grabbed concurrently.
const FRAME_CONCURRENCY: usize = 4;

/// Scores each scene by the frame at its start: mean Sobel gradient
/// magnitude of the luma plane plus the luma standard deviation.
#[derive(Debug, Clone)]
pub struct FrameIntensity {
    top_k: usize,
}

impl FrameIntensity {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    async fn score_scene(
        &self,
        video: &Path,
        scene: &DetectedScene,
        frames_dir: &Path,
        cancel: &CancelSignal,
    ) -> WorkerResult<f64> {
        if *cancel.borrow() {
            return Err(WorkerError::Cancelled);
        }
        let frame_path: PathBuf = frames_dir.join(format!("scene_{:04}.png", scene.index));
        let runner = FfmpegRunner::new().with_cancel(cancel.clone());
        extract_frame(video, &frame_path, scene.start_time, &runner).await?;

        let score = tokio::task::spawn_blocking(move || -> WorkerResult<f64> {
            let img = image::open(&frame_path).map_err(|e| {
                WorkerError::scene_analysis_failed(format!("{}: {}", frame_path.display(), e))
            })?;
            Ok(frame_intensity(&img))
        })
        .await
        .map_err(|e| WorkerError::scene_analysis_failed(format!("frame analysis task failed: {}", e)))??;

        Ok(score)
    }
}

#[async_trait]
impl IntensityScorer for FrameIntensity {
    async fn score(
        &self,
        video: &Path,
        scenes: &[DetectedScene],
        work_dir: &Path,
        cancel: &CancelSignal,
    ) -> WorkerResult<Vec<ScoredSegment>> {
        let frames_dir = work_dir.join("frames");
        tokio::fs::create_dir_all(&frames_dir).await?;

        let frames_dir = frames_dir.as_path();
        let mut scored: Vec<ScoredSegment> = stream::iter(scenes)
            .map(|scene| async move {
                match self.score_scene(video, scene, frames_dir, cancel).await {
                    Ok(score) => {
                        debug!(scene = scene.index, score, "Scored scene");
                        Ok(Some(ScoredSegment::new(scene.start_time, scene.end_time, score)))
                    }
                    Err(e) if e.is_cancellation() => Err(e),
                    Err(e) => {
                        warn!(scene = scene.index, "Skipping scene: {}", e);
                        Ok(None)
                    }
                }
            })
            .buffered(FRAME_CONCURRENCY)
            .boxed()
            .try_filter_map(|scored| async move { Ok(scored) })
            .try_collect()
            .await?;

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.top_k);
        Ok(scored)
    }
}

/// Intensity of one frame: `mean |Sobel| + stddev(luma)`, both on the
/// 0-255 luma scale.
pub fn frame_intensity(img: &DynamicImage) -> f64 {
    let img = if img.width() > ANALYSIS_WIDTH {
        img.resize(ANALYSIS_WIDTH, u32::MAX, FilterType::Triangle)
    } else {
        img.clone()
    };
    let luma = img.to_luma8();
    mean_gradient(&luma) + luma_std_dev(&luma)
}

fn mean_gradient(luma: &GrayImage) -> f64 {
    let (w, h) = luma.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| luma.get_pixel(x, y)[0] as f64;
    let mut total = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x - 1, y)
                - px(x - 1, y + 1);
            let gy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x, y - 1)
                - px(x + 1, y - 1);
            total += (gx * gx + gy * gy).sqrt();
        }
    }
    // Sobel magnitude peaks at 4 * 255 * sqrt(2); rescale to the luma range.
    let max_magnitude = 4.0 * 255.0 * std::f64::consts::SQRT_2;
    total / ((w - 2) * (h - 2)) as f64 / max_magnitude * 255.0
}

fn luma_std_dev(luma: &GrayImage) -> f64 {
    let n = luma.width() as f64 * luma.height() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = luma.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let variance = luma
        .pixels()
        .map(|p| {
            let d = p[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}
