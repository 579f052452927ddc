//! Single frame grabs.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Write the frame at `time_secs` of `input` to `output` (format from extension).
pub async fn extract_frame(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    time_secs: f64,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let cmd = frame_command(input.as_ref(), output.as_ref(), time_secs);
    runner.run(&cmd).await
}

fn frame_command(input: &Path, output: &Path, time_secs: f64) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .seek(time_secs.max(0.0))
        .single_frame()
        .no_audio()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_command() {
        let args = frame_command(Path::new("v.mp4"), Path::new("f.png"), -2.0).build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "0.000");
        assert!(args.join(" ").contains("-frames:v 1"));
    }
}
