//! PySceneDetect backed scene detection.

use std::path::Path;

use async_trait::async_trait;

use shortgen_media::{detect_scenes, SceneDetectOptions};
use shortgen_models::DetectedScene;

use super::SceneDetector;
use crate::error::WorkerResult;

#[derive(Debug, Clone, Default)]
pub struct SceneDetectCli {
    options: SceneDetectOptions,
}

impl SceneDetectCli {
    pub fn new(threshold: f64) -> Self {
        Self {
            options: SceneDetectOptions::default().with_threshold(threshold),
        }
    }
}

#[async_trait]
impl SceneDetector for SceneDetectCli {
    async fn detect(&self, video: &Path, work_dir: &Path) -> WorkerResult<Vec<DetectedScene>> {
        Ok(detect_scenes(video, work_dir, &self.options).await?)
    }
}
