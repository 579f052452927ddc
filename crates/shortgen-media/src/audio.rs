//! Audio track extraction for transcription.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sample rate expected by speech-to-text models.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Extract the audio track of `input` into a 16 kHz mono PCM WAV file.
pub async fn extract_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    info!("Extracting audio: {} -> {}", input.display(), output.display());

    let cmd = audio_command(input, output);
    runner.run(&cmd).await
}

fn audio_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .output_arg("-acodec")
        .output_arg("pcm_s16le")
        .audio_sample_rate(SPEECH_SAMPLE_RATE)
        .audio_channels(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_command_is_mono_16k_pcm() {
        let args = audio_command(Path::new("talk.mp4"), Path::new("talk.wav")).build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-vn"));
        assert!(joined.contains("-acodec pcm_s16le"));
        assert!(joined.contains("-ar 16000"));
        assert!(joined.contains("-ac 1"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let err = extract_audio("/nonexistent/video.mp4", "/tmp/out.wav", &FfmpegRunner::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
