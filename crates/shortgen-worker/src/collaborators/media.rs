//! FFmpeg backed media tooling.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use shortgen_media::{cut_clip, extract_audio, probe_video, ClipEncoding, FfmpegRunner, VideoInfo};
use shortgen_models::Highlight;

use super::{CancelSignal, MediaTools};
use crate::error::WorkerResult;

/// Media tooling through the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegMedia {
    encoding: ClipEncoding,
}

impl FfmpegMedia {
    pub fn new(encoding: ClipEncoding) -> Self {
        Self { encoding }
    }
}

#[async_trait]
impl MediaTools for FfmpegMedia {
    async fn probe(&self, video: &Path) -> WorkerResult<VideoInfo> {
        Ok(probe_video(video).await?)
    }

    async fn extract_audio(
        &self,
        video: &Path,
        output: &Path,
        cancel: &CancelSignal,
    ) -> WorkerResult<()> {
        let runner = FfmpegRunner::new().with_cancel(cancel.clone());
        Ok(extract_audio(video, output, &runner).await?)
    }

    async fn cut_clip(
        &self,
        video: &Path,
        output: &Path,
        highlight: &Highlight,
        with_audio: bool,
        cancel: &CancelSignal,
    ) -> WorkerResult<()> {
        let encoding = if with_audio {
            self.encoding.clone()
        } else {
            self.encoding.clone().without_audio()
        };
        let runner = FfmpegRunner::new().with_cancel(cancel.clone());
        let clip_name = output.display().to_string();

        cut_clip(
            video,
            output,
            highlight.start_time,
            highlight.end_time,
            &encoding,
            &runner,
            move |p| debug!(clip = %clip_name, out_time_ms = p.out_time_ms, "Encoding"),
        )
        .await?;
        Ok(())
    }
}
