//! Alignment of sentiment and intensity segments into one scored table.

use std::collections::HashMap;

use shortgen_models::{MergeStrategy, MergedSegment, ScoreWeights, ScoredSegment};
use tracing::debug;

use crate::normalize::normalize;

/// Bit-exact key of a `(start_time, end_time)` pair.
///
/// `-0.0` and `0.0` are folded together so that equal floats compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TimeKey(u64, u64);

impl TimeKey {
    fn of(start: f64, end: f64) -> Self {
        Self(canonical_bits(start), canonical_bits(end))
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    start_time: f64,
    end_time: f64,
    sentiment_score: f64,
    intensity_score: f64,
    /// Created by a sentiment segment
    from_sentiment: bool,
}

/// Insertion-ordered table of merged entries.
#[derive(Debug, Default)]
struct SegmentTable {
    entries: Vec<Entry>,
    index: HashMap<TimeKey, usize>,
}

impl SegmentTable {
    fn slot(&mut self, start: f64, end: f64) -> &mut Entry {
        let key = TimeKey::of(start, end);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push(Entry {
                    start_time: start,
                    end_time: end,
                    sentiment_score: 0.0,
                    intensity_score: 0.0,
                    from_sentiment: false,
                });
                let idx = self.entries.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.entries[idx]
    }

    /// Index of the sentiment entry with the highest IoU against
    /// `[start, end)`, provided it reaches `min_iou`. Earlier entries win ties.
    fn best_overlap(&self, start: f64, end: f64, min_iou: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            if !entry.from_sentiment {
                continue;
            }
            let iou = interval_iou(entry.start_time, entry.end_time, start, end);
            if iou >= min_iou && best.map_or(true, |(_, b)| iou > b) {
                best = Some((idx, iou));
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn into_merged(self, weights: ScoreWeights) -> Vec<MergedSegment> {
        self.entries
            .into_iter()
            .map(|e| MergedSegment {
                start_time: e.start_time,
                end_time: e.end_time,
                sentiment_score: e.sentiment_score,
                intensity_score: e.intensity_score,
                combined_score: e.sentiment_score * weights.sentiment
                    + e.intensity_score * weights.intensity,
            })
            .collect()
    }
}

/// Intersection-over-union of two intervals. Degenerate intervals have no
/// overlap with anything.
fn interval_iou(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    if a_end <= a_start || b_end <= b_start {
        return 0.0;
    }
    let intersection = (a_end.min(b_end) - a_start.max(b_start)).max(0.0);
    let union = (a_end.max(b_end) - a_start.min(b_start)).max(f64::EPSILON);
    intersection / union
}

/// Merge two signals with the exact `(start_time, end_time)` join.
///
/// Both inputs are normalized independently first. Segments whose boundaries
/// differ in any bit are never combined. The result follows first-seen key
/// order (sentiment keys first); callers that need ranking must sort.
pub fn merge(
    sentiment: &[ScoredSegment],
    intensity: &[ScoredSegment],
    weight_sentiment: f64,
    weight_intensity: f64,
) -> Vec<MergedSegment> {
    merge_with(
        sentiment,
        intensity,
        ScoreWeights::new(weight_sentiment, weight_intensity),
        MergeStrategy::Exact,
    )
}

/// Merge two signals with an explicit alignment strategy.
///
/// With [`MergeStrategy::Overlap`] an intensity segment without an exact key
/// match is folded into the sentiment entry it overlaps best (IoU at least
/// `min_iou`), keeping that entry's boundaries and the larger of the
/// intensity scores folded into it. This changes which segments combine and
/// is never the default.
pub fn merge_with(
    sentiment: &[ScoredSegment],
    intensity: &[ScoredSegment],
    weights: ScoreWeights,
    strategy: MergeStrategy,
) -> Vec<MergedSegment> {
    let norm_sentiment = normalize(sentiment);
    let norm_intensity = normalize(intensity);

    let mut table = SegmentTable::default();

    for seg in &norm_sentiment {
        let entry = table.slot(seg.start_time, seg.end_time);
        entry.sentiment_score = seg.score;
        entry.from_sentiment = true;
    }

    for seg in &norm_intensity {
        match strategy {
            MergeStrategy::Exact => {
                table.slot(seg.start_time, seg.end_time).intensity_score = seg.score;
            }
            MergeStrategy::Overlap { min_iou } => {
                let key = TimeKey::of(seg.start_time, seg.end_time);
                if table.index.contains_key(&key) {
                    table.slot(seg.start_time, seg.end_time).intensity_score = seg.score;
                } else if let Some(idx) = table.best_overlap(seg.start_time, seg.end_time, min_iou)
                {
                    let entry = &mut table.entries[idx];
                    entry.intensity_score = entry.intensity_score.max(seg.score);
                } else {
                    table.slot(seg.start_time, seg.end_time).intensity_score = seg.score;
                }
            }
        }
    }

    debug!(
        sentiment = sentiment.len(),
        intensity = intensity.len(),
        merged = table.entries.len(),
        "Merged segment signals"
    );

    table.into_merged(weights)
}
