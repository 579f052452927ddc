//! Whisper CLI transcription.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Transcriber;
use crate::error::{WorkerError, WorkerResult};

/// Runs the `whisper` command line tool and reads its text output.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    model: String,
    binary: String,
}

impl WhisperCli {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            binary: "whisper".to_string(),
        }
    }

    fn build_args(&self, audio: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            audio.to_string_lossy().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "txt".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ]
    }

    /// Whisper names the text file after the audio file stem.
    fn transcript_path(audio: &Path, output_dir: &Path) -> PathBuf {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        output_dir.join(format!("{}.txt", stem))
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio: &Path, work_dir: &Path) -> WorkerResult<String> {
        which::which(&self.binary)
            .map_err(|_| WorkerError::transcription_failed("whisper not found in PATH"))?;

        let output_dir = work_dir.join("transcript");
        tokio::fs::create_dir_all(&output_dir).await?;

        let args = self.build_args(audio, &output_dir);
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::transcription_failed(format!(
                "whisper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = tokio::fs::read_to_string(Self::transcript_path(audio, &output_dir)).await?;
        let text = text.lines().map(str::trim).collect::<Vec<_>>().join(" ");
        info!("Transcribed {} characters with model {}", text.len(), self.model);
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_and_output_path() {
        let whisper = WhisperCli::new("base");
        let args = whisper.build_args(Path::new("/w/audio.wav"), Path::new("/w/transcript"));
        assert_eq!(args[0], "/w/audio.wav");
        assert_eq!(&args[1..3], ["--model", "base"]);
        assert!(args.contains(&"txt".to_string()));
        assert_eq!(
            WhisperCli::transcript_path(Path::new("/w/audio.wav"), Path::new("/w/transcript")),
            PathBuf::from("/w/transcript/audio.txt")
        );
    }
}
