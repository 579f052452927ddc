//! PySceneDetect invocation and scene list parsing.
//!
//! Scene boundaries come from the `scenedetect` CLI running the content
//! detector. Its `list-scenes` CSV is parsed by header name so column order
//! changes between PySceneDetect releases do not matter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use shortgen_models::DetectedScene;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

const START_COLUMN: &str = "Start Time (seconds)";
const END_COLUMN: &str = "End Time (seconds)";
const INDEX_COLUMN: &str = "Scene Number";

/// Content detector settings.
#[derive(Debug, Clone)]
pub struct SceneDetectOptions {
    /// `detect-content --threshold`
    pub threshold: f64,
    /// Kill the detector after this long
    pub timeout: Option<Duration>,
}

impl Default for SceneDetectOptions {
    fn default() -> Self {
        Self {
            threshold: 30.0,
            timeout: None,
        }
    }
}

impl SceneDetectOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_args(&self, video: &Path, output_dir: &Path, list_file: &Path) -> Vec<String> {
        vec![
            "--input".to_string(),
            video.to_string_lossy().to_string(),
            "--output".to_string(),
            output_dir.to_string_lossy().to_string(),
            "detect-content".to_string(),
            "--threshold".to_string(),
            format!("{}", self.threshold),
            "list-scenes".to_string(),
            "--output".to_string(),
            list_file.to_string_lossy().to_string(),
        ]
    }
}

/// Run scene detection on `video`, writing the scene list under `work_dir`.
///
/// An empty list means the detector found no cuts.
pub async fn detect_scenes(
    video: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    options: &SceneDetectOptions,
) -> MediaResult<Vec<DetectedScene>> {
    let video = video.as_ref();
    let work_dir = work_dir.as_ref();

    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }
    which::which("scenedetect").map_err(|_| MediaError::SceneDetectNotFound)?;

    let output_dir = work_dir.join("scenes");
    tokio::fs::create_dir_all(&output_dir).await?;
    let list_file: PathBuf = work_dir.join("scenes.csv");

    let args = options.build_args(video, &output_dir, &list_file);
    debug!("Running scenedetect {}", args.join(" "));

    let child = Command::new("scenedetect")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match options.timeout {
        Some(limit) => tokio::time::timeout(limit, child)
            .await
            .map_err(|_| MediaError::Timeout(limit.as_secs()))??,
        None => child.await?,
    };

    if !output.status.success() {
        return Err(MediaError::scene_detect_failed(
            format!("scenedetect exited with {}", output.status),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    if !list_file.exists() {
        warn!("scenedetect wrote no scene list at {}", list_file.display());
        return Ok(Vec::new());
    }

    let text = tokio::fs::read_to_string(&list_file).await?;
    let scenes = parse_scene_list(&text)?;
    info!("Detected {} scenes in {}", scenes.len(), video.display());
    Ok(scenes)
}

/// Parse a `list-scenes` CSV.
///
/// A leading `Timecode List:` row is skipped. Scenes whose end precedes
/// their start are rejected.
pub fn parse_scene_list(text: &str) -> MediaResult<Vec<DetectedScene>> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .skip_while(|l| l.starts_with("Timecode List"));

    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };

    let columns: HashMap<&str, usize> = split_row(header)
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let column = |name: &str| {
        columns
            .get(name)
            .copied()
            .ok_or_else(|| MediaError::invalid_scene_list(format!("missing column '{}'", name)))
    };
    let start_col = column(START_COLUMN)?;
    let end_col = column(END_COLUMN)?;
    let index_col = columns.get(INDEX_COLUMN).copied();

    let mut scenes = Vec::new();
    for (row_no, line) in lines.enumerate() {
        let fields = split_row(line);
        let number = |col: usize| -> MediaResult<f64> {
            fields
                .get(col)
                .and_then(|f| f.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    MediaError::invalid_scene_list(format!("row {}: bad value in column {}", row_no + 1, col))
                })
        };

        let start = number(start_col)?;
        let end = number(end_col)?;
        if end < start {
            return Err(MediaError::invalid_scene_list(format!(
                "row {}: end {:.3} before start {:.3}",
                row_no + 1,
                end,
                start
            )));
        }

        let index = index_col
            .and_then(|c| fields.get(c))
            .and_then(|f| f.parse::<u32>().ok())
            .unwrap_or(row_no as u32 + 1);

        scenes.push(DetectedScene::new(index, start, end));
    }

    Ok(scenes)
}

fn split_row(line: &str) -> Vec<&str> {
    line.split(',').map(|f| f.trim().trim_matches('"')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Timecode List:,00:00:04.200,00:00:10.000
Scene Number,Start Frame,Start Timecode,Start Time (seconds),End Frame,End Timecode,End Time (seconds),Length (frames),Length (timecode),Length (seconds)
1,1,00:00:00.000,0.000,105,00:00:04.200,4.200,105,00:00:04.200,4.200
2,106,00:00:04.200,4.200,250,00:00:10.000,10.000,145,00:00:05.800,5.800
";

    #[test]
    fn test_parse_sample_list() {
        let scenes = parse_scene_list(SAMPLE).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].index, 1);
        assert_eq!(scenes[1].time_range(), (4.2, 10.0));
        assert!((scenes[1].length - 5.8).abs() < 1e-9);
    }

    #[test]
    fn test_parse_reordered_columns() {
        let csv = "End Time (seconds),Start Time (seconds)\n12.5,2.5\n";
        let scenes = parse_scene_list(csv).unwrap();
        assert_eq!(scenes[0].time_range(), (2.5, 12.5));
        assert_eq!(scenes[0].index, 1);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_scene_list("").unwrap().is_empty());
        assert!(parse_scene_list("Timecode List:\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_missing_column() {
        let err = parse_scene_list("Scene Number,Start Frame\n1,1\n").unwrap_err();
        assert!(matches!(err, MediaError::InvalidSceneList(_)));
    }

    #[test]
    fn test_parse_rejects_inverted_scene() {
        let csv = "Start Time (seconds),End Time (seconds)\n10.0,4.0\n";
        assert!(parse_scene_list(csv).is_err());
    }

    #[test]
    fn test_build_args() {
        let args = SceneDetectOptions::default().with_threshold(27.5).build_args(
            Path::new("v.mp4"),
            Path::new("/tmp/s"),
            Path::new("/tmp/s.csv"),
        );
        assert_eq!(args[4], "detect-content");
        assert_eq!(args[6], "27.5");
        assert_eq!(args.last().unwrap(), "/tmp/s.csv");
    }
}
