//! FFmpeg CLI wrapper for the highlight pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts via tokio
//! - Probing, audio extraction, frame grabs and subclip cutting
//! - PySceneDetect invocation and scene list parsing

pub mod audio;
pub mod clip;
pub mod command;
pub mod error;
pub mod frame;
pub mod probe;
pub mod progress;
pub mod scenes;

pub use audio::extract_audio;
pub use clip::{cut_clip, ClipEncoding};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frame::extract_frame;
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use scenes::{detect_scenes, parse_scene_list, SceneDetectOptions};
