//! Highlight subclip cutting.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Encoder settings for highlight clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEncoding {
    pub video_codec: String,
    /// `None` writes a clip without an audio stream
    pub audio_codec: Option<String>,
    pub threads: usize,
    pub preset: Option<String>,
}

impl Default for ClipEncoding {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: Some("aac".to_string()),
            threads: 2,
            preset: None,
        }
    }
}

impl ClipEncoding {
    /// Same encoding without audio, for silent sources.
    pub fn without_audio(mut self) -> Self {
        self.audio_codec = None;
        self
    }
}

/// Re-encode `[start_secs, end_secs)` of `input` into `output`.
pub async fn cut_clip<F>(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    end_secs: f64,
    encoding: &ClipEncoding,
    runner: &FfmpegRunner,
    progress_callback: F,
) -> MediaResult<()>
where
    F: Fn(FfmpegProgress) + Send + 'static,
{
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if !(start_secs >= 0.0 && start_secs < end_secs) {
        return Err(MediaError::InvalidVideo(format!(
            "invalid clip range {:.2}..{:.2}",
            start_secs, end_secs
        )));
    }

    info!(
        "Cutting clip: {} -> {} ({:.2}s - {:.2}s)",
        input.display(),
        output.display(),
        start_secs,
        end_secs
    );

    let cmd = clip_command(input, output, start_secs, end_secs, encoding);
    runner.run_with_progress(&cmd, progress_callback).await?;

    if !output.exists() {
        return Err(MediaError::ffmpeg_failed(
            format!("FFmpeg produced no output at {}", output.display()),
            None,
            None,
        ));
    }

    Ok(())
}

fn clip_command(
    input: &Path,
    output: &Path,
    start_secs: f64,
    end_secs: f64,
    encoding: &ClipEncoding,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(input, output)
        .seek(start_secs)
        .duration(end_secs - start_secs)
        .video_codec(&encoding.video_codec);

    cmd = match &encoding.audio_codec {
        Some(codec) => cmd.audio_codec(codec),
        None => cmd.no_audio(),
    };

    if let Some(preset) = &encoding.preset {
        cmd = cmd.preset(preset);
    }

    cmd.threads(encoding.threads)
}
