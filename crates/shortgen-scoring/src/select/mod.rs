//! Highlight selection.
//!
//! Selection is an ordered list of [`SelectionTier`] strategies. Each tier
//! is asked only for the highlights still missing after the previous ones:
//!
//! 1. [`MergedScoreTier`] ranks merged segments by combined score.
//! 2. [`SceneFallbackTier`] walks the raw scene list chronologically.
//! 3. [`UniformSliceTier`] slices the timeline into equal windows.
//!
//! The result may hold fewer than the requested count when the media is too
//! short to fit that many non-degenerate windows. That is a capacity limit,
//! not an error, so callers must check the returned length.

mod duration;
mod tiers;

use shortgen_models::{DurationBounds, Highlight, MergedSegment, RawScene};
use tracing::debug;

pub use duration::normalize_duration;
pub use tiers::{MergedScoreTier, SceneFallbackTier, UniformSliceTier, MIN_UNIFORM_WINDOW};

/// Inputs shared by every tier of one selection run.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Merged segments in merger order
    pub merged: &'a [MergedSegment],
    /// Raw scenes in chronological order, when scene detection succeeded
    pub raw_scenes: Option<&'a [RawScene]>,
    /// Media length in seconds
    pub total_duration: f64,
    /// Clip length range
    pub bounds: DurationBounds,
}

/// One strategy of the fallback cascade.
pub trait SelectionTier: Send + Sync {
    /// Tier name for logs.
    fn name(&self) -> &'static str;

    /// Produce up to `needed` valid highlights.
    fn candidates(&self, ctx: &SelectionContext<'_>, needed: usize) -> Vec<Highlight>;
}

/// Runs tiers in order until the target count is met.
pub struct HighlightSelector {
    tiers: Vec<Box<dyn SelectionTier>>,
}

impl Default for HighlightSelector {
    fn default() -> Self {
        Self::new(vec![
            Box::new(MergedScoreTier),
            Box::new(SceneFallbackTier),
            Box::new(UniformSliceTier),
        ])
    }
}

impl HighlightSelector {
    pub fn new(tiers: Vec<Box<dyn SelectionTier>>) -> Self {
        Self { tiers }
    }

    /// Number of configured tiers.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Select up to `num_highlights` highlights.
    pub fn select(&self, ctx: &SelectionContext<'_>, num_highlights: usize) -> Vec<Highlight> {
        let mut highlights: Vec<Highlight> = Vec::new();

        for tier in &self.tiers {
            if highlights.len() >= num_highlights {
                break;
            }
            let needed = num_highlights - highlights.len();
            let mut found = tier.candidates(ctx, needed);
            found.truncate(needed);
            found.retain(|h| h.is_valid(ctx.total_duration));

            debug!(
                tier = tier.name(),
                needed,
                produced = found.len(),
                "Selection tier finished"
            );
            highlights.extend(found);
        }

        highlights
    }
}

/// Select highlights with the default three-tier cascade.
pub fn select(
    merged: &[MergedSegment],
    raw_scenes: Option<&[RawScene]>,
    total_duration: f64,
    num_highlights: usize,
    duration_bounds: DurationBounds,
) -> Vec<Highlight> {
    let ctx = SelectionContext {
        merged,
        raw_scenes,
        total_duration,
        bounds: duration_bounds,
    };
    HighlightSelector::default().select(&ctx, num_highlights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::HighlightSource;

    fn merged(start: f64, end: f64, combined: f64) -> MergedSegment {
        MergedSegment {
            start_time: start,
            end_time: end,
            sentiment_score: 0.0,
            intensity_score: 0.0,
            combined_score: combined,
        }
    }

    fn windows(highlights: &[Highlight]) -> Vec<(f64, f64)> {
        highlights.iter().map(|h| (h.start_time, h.end_time)).collect()
    }

    #[test]
    fn test_scene_fallback_example() {
        let scenes = [RawScene::new(0.0, 40.0), RawScene::new(50.0, 10.0)];
        let out = select(&[], Some(&scenes), 100.0, 2, DurationBounds::new(20.0, 30.0));
        assert_eq!(windows(&out), vec![(0.0, 30.0), (50.0, 70.0)]);
        assert!(out.iter().all(|h| h.source == HighlightSource::Scene));
    }

    #[test]
    fn test_uniform_fallback_example() {
        let out = select(&[], None, 90.0, 2, DurationBounds::new(20.0, 30.0));
        assert_eq!(windows(&out), vec![(30.0, 60.0), (60.0, 90.0)]);
        assert!(out.iter().all(|h| h.source == HighlightSource::Uniform));
    }

    #[test]
    fn test_merged_tier_ranks_by_combined_score() {
        let segments = [
            merged(0.0, 25.0, 0.2),
            merged(100.0, 125.0, 0.9),
            merged(200.0, 225.0, 0.5),
        ];
        let out = select(&segments, None, 300.0, 2, DurationBounds::new(20.0, 30.0));
        assert_eq!(windows(&out), vec![(100.0, 125.0), (200.0, 225.0)]);
        assert!(out.iter().all(|h| h.source == HighlightSource::Merged));
    }

    #[test]
    fn test_ties_keep_merger_order() {
        let segments = [
            merged(40.0, 65.0, 0.5),
            merged(0.0, 25.0, 0.5),
            merged(80.0, 105.0, 0.5),
        ];
        let out = select(&segments, None, 300.0, 3, DurationBounds::new(20.0, 30.0));
        assert_eq!(
            windows(&out),
            vec![(40.0, 65.0), (0.0, 25.0), (80.0, 105.0)]
        );
    }

    #[test]
    fn test_tiers_fill_shortfall_in_order() {
        let segments = [merged(10.0, 35.0, 1.0)];
        let scenes = [RawScene::new(100.0, 25.0)];
        let out = select(&segments, Some(&scenes), 300.0, 4, DurationBounds::new(20.0, 30.0));

        let sources: Vec<HighlightSource> = out.iter().map(|h| h.source).collect();
        assert_eq!(
            sources,
            vec![
                HighlightSource::Merged,
                HighlightSource::Scene,
                HighlightSource::Uniform,
                HighlightSource::Uniform,
            ]
        );
        // Two uniform slots remain: segment_length = min(30, 300 / 3) = 30.
        assert_eq!(windows(&out[2..]), vec![(30.0, 60.0), (60.0, 90.0)]);
    }

    #[test]
    fn test_dropped_merged_candidates_fall_through() {
        // Starts past the end of the media, so the clamp makes it degenerate.
        let segments = [merged(500.0, 525.0, 1.0)];
        let out = select(&segments, None, 90.0, 1, DurationBounds::new(20.0, 30.0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, HighlightSource::Uniform);
    }

    #[test]
    fn test_zero_requested() {
        let segments = [merged(0.0, 25.0, 1.0)];
        assert!(select(&segments, None, 100.0, 0, DurationBounds::default()).is_empty());
    }

    #[test]
    fn test_zero_duration_media_yields_nothing() {
        let segments = [merged(0.0, 25.0, 1.0)];
        let scenes = [RawScene::new(0.0, 10.0)];
        let out = select(&segments, Some(&scenes), 0.0, 3, DurationBounds::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_every_highlight_is_valid() {
        let segments = [
            merged(-5.0, 2.0, 0.9),
            merged(80.0, 200.0, 0.8),
            merged(40.0, 40.0, 0.7),
            merged(95.0, 99.0, 0.6),
        ];
        let scenes = [
            RawScene::new(0.0, 3.0),
            RawScene::new(3.0, 90.0),
            RawScene::new(93.0, 7.0),
        ];
        let total = 100.0;
        for n in 0..8 {
            let out = select(&segments, Some(&scenes), total, n, DurationBounds::new(20.0, 30.0));
            assert!(out.len() <= n);
            for h in &out {
                assert!(h.start_time >= 0.0, "{:?}", h);
                assert!(h.start_time < h.end_time, "{:?}", h);
                assert!(h.end_time <= total, "{:?}", h);
            }
        }
    }

    #[test]
    fn test_huge_count_is_a_capacity_limit() {
        let out = select(&[], None, 100.0, usize::MAX, DurationBounds::new(20.0, 30.0));
        assert!(!out.is_empty());
        assert!(out.len() <= 100 * 100);
        assert!(out.iter().all(|h| h.is_valid(100.0)));

        let segments = [merged(10.0, 35.0, 1.0)];
        let scenes = [RawScene::new(40.0, 25.0)];
        let out = select(
            &segments,
            Some(&scenes),
            100.0,
            usize::MAX,
            DurationBounds::new(20.0, 30.0),
        );
        assert_eq!(out[0].source, HighlightSource::Merged);
        assert_eq!(out[1].source, HighlightSource::Scene);
    }

    #[test]
    fn test_custom_tier_list() {
        let selector = HighlightSelector::new(vec![Box::new(UniformSliceTier)]);
        assert_eq!(selector.len(), 1);

        let segments = [merged(0.0, 25.0, 1.0)];
        let ctx = SelectionContext {
            merged: &segments,
            raw_scenes: None,
            total_duration: 90.0,
            bounds: DurationBounds::new(20.0, 30.0),
        };
        let out = selector.select(&ctx, 2);
        assert!(out.iter().all(|h| h.source == HighlightSource::Uniform));
    }
}
