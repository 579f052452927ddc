//! Time segment models.
//!
//! Producers (sentiment and intensity collaborators) emit [`ScoredSegment`]s;
//! the merger turns them into [`MergedSegment`]s. Scene detection emits
//! [`DetectedScene`]s, of which the selector only needs the [`RawScene`] view.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time range with a single raw score.
///
/// `end_time > start_time` is not guaranteed: line-based producers estimate
/// their timestamps and may emit degenerate or colliding ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredSegment {
    /// Start in seconds
    pub start_time: f64,
    /// End in seconds
    pub end_time: f64,
    /// Raw (or normalized) score
    pub score: f64,
}

impl ScoredSegment {
    pub fn new(start_time: f64, end_time: f64, score: f64) -> Self {
        Self {
            start_time,
            end_time,
            score,
        }
    }

    /// Length in seconds (may be zero or negative for degenerate producers).
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Copy of this segment with a different score.
    pub fn with_score(&self, score: f64) -> Self {
        Self { score, ..*self }
    }
}

/// A segment carrying both normalized signals and their weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergedSegment {
    pub start_time: f64,
    pub end_time: f64,
    /// Normalized sentiment score, 0 when no sentiment segment matched
    pub sentiment_score: f64,
    /// Normalized intensity score, 0 when no intensity segment matched
    pub intensity_score: f64,
    /// `sentiment * w_sentiment + intensity * w_intensity`
    pub combined_score: f64,
}

impl MergedSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Scene start and length, as consumed by the scene fallback tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawScene {
    pub start_time: f64,
    pub length: f64,
}

impl RawScene {
    pub fn new(start_time: f64, length: f64) -> Self {
        Self { start_time, length }
    }
}

/// A scene as reported by scene detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedScene {
    /// 1-indexed scene number
    pub index: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub length: f64,
}

impl DetectedScene {
    pub fn new(index: u32, start_time: f64, end_time: f64) -> Self {
        Self {
            index,
            start_time,
            end_time,
            length: end_time - start_time,
        }
    }

    pub fn to_raw(&self) -> RawScene {
        RawScene::new(self.start_time, self.length)
    }

    pub fn time_range(&self) -> (f64, f64) {
        (self.start_time, self.end_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_score_keeps_bounds() {
        let seg = ScoredSegment::new(10.0, 20.0, 0.7);
        let rescored = seg.with_score(0.1);
        assert_eq!(rescored.start_time, 10.0);
        assert_eq!(rescored.end_time, 20.0);
        assert_eq!(rescored.score, 0.1);
        assert_eq!(seg.score, 0.7);
    }

    #[test]
    fn test_detected_scene_length() {
        let scene = DetectedScene::new(1, 12.5, 20.0);
        assert!((scene.length - 7.5).abs() < 1e-9);
        assert_eq!(scene.to_raw(), RawScene::new(12.5, 7.5));
    }

    #[test]
    fn test_segment_serialization() {
        let seg = ScoredSegment::new(0.0, 10.0, -0.4);
        let json = serde_json::to_string(&seg).unwrap();
        assert!(json.contains("\"start_time\":0.0"));
        assert!(json.contains("\"score\":-0.4"));
    }
}
