//! The three strategies of the selection cascade.

use shortgen_models::{Highlight, HighlightSource, MergedSegment};

use super::duration::normalize_duration;
use super::{SelectionContext, SelectionTier};

/// Top merged segments by combined score, duration-normalized.
///
/// Candidates dropped by normalization are not replaced by lower-ranked
/// segments; the later tiers cover the shortfall.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergedScoreTier;

impl SelectionTier for MergedScoreTier {
    fn name(&self) -> &'static str {
        "merged"
    }

    fn candidates(&self, ctx: &SelectionContext<'_>, needed: usize) -> Vec<Highlight> {
        let mut ranked: Vec<&MergedSegment> = ctx.merged.iter().collect();
        // Stable sort: equal scores keep merger order.
        ranked.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));

        ranked
            .into_iter()
            .take(needed)
            .filter_map(|seg| {
                normalize_duration(seg.start_time, seg.end_time, ctx.bounds, ctx.total_duration)
            })
            .map(|(start, end)| Highlight::new(start, end, HighlightSource::Merged))
            .collect()
    }
}

/// Raw scenes in chronological order, capped at `bounds.max`.
///
/// A scene shorter than `bounds.min` is stretched to `bounds.min` unless it
/// is the closing scene of the media: the last listed scene whose extent
/// reaches `total_duration`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneFallbackTier;

impl SelectionTier for SceneFallbackTier {
    fn name(&self) -> &'static str {
        "scene"
    }

    fn candidates(&self, ctx: &SelectionContext<'_>, needed: usize) -> Vec<Highlight> {
        let Some(scenes) = ctx.raw_scenes else {
            return Vec::new();
        };

        let total = ctx.total_duration;
        let mut highlights = Vec::with_capacity(needed.min(scenes.len()));

        for (i, scene) in scenes.iter().enumerate() {
            if highlights.len() >= needed {
                break;
            }

            let start = scene.start_time.max(0.0);
            let mut end = (start + ctx.bounds.max.min(scene.length)).min(total);

            let is_closing_scene =
                i + 1 == scenes.len() && scene.start_time + scene.length >= total;
            if end - start < ctx.bounds.min && !is_closing_scene {
                end = (start + ctx.bounds.min).min(total);
            }

            if start < end {
                highlights.push(Highlight::new(start, end, HighlightSource::Scene));
            }
        }

        highlights
    }
}

/// Shortest window the uniform tier emits, in seconds.
pub const MIN_UNIFORM_WINDOW: f64 = 0.01;

/// Equally spaced windows, skipping the leading slot.
///
/// With `remaining` slots to fill the window length is
/// `min(bounds.max, total_duration / (remaining + 1))` and window `i` starts
/// at `(i + 1) * length`. A request so large that windows would be shorter
/// than [`MIN_UNIFORM_WINDOW`] is sliced at that length instead, so the tier
/// yields at most `total_duration / MIN_UNIFORM_WINDOW` windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSliceTier;

impl SelectionTier for UniformSliceTier {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn candidates(&self, ctx: &SelectionContext<'_>, needed: usize) -> Vec<Highlight> {
        if needed == 0 {
            return Vec::new();
        }

        let total = ctx.total_duration;
        if !(total > 0.0) {
            return Vec::new();
        }
        let segment_length = ctx.bounds.max.min(total / (needed as f64 + 1.0));
        if !(segment_length > 0.0) {
            return Vec::new();
        }
        let segment_length = segment_length.max(MIN_UNIFORM_WINDOW);
        // Windows starting at or past the end are all degenerate.
        let slots = needed.min((total / segment_length).ceil() as usize);

        (0..slots)
            .filter_map(|i| {
                let start = (i as f64 + 1.0) * segment_length;
                let end = (start + segment_length).min(total);
                (start >= 0.0 && start < end)
                    .then(|| Highlight::new(start, end, HighlightSource::Uniform))
            })
            .collect()
    }
}
