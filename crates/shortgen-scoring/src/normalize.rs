//! Min-max score normalization.

use shortgen_models::ScoredSegment;

/// Rescale scores to `[0, 1]` using the min and max of the input.
///
/// When every score is equal the range is taken as `1`, so all outputs are
/// `raw - min` (that is, `0`). Time fields are copied unchanged and the input
/// is left untouched.
pub fn normalize(segments: &[ScoredSegment]) -> Vec<ScoredSegment> {
    if segments.is_empty() {
        return Vec::new();
    }

    let (min_score, max_score) = segments.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), seg| (lo.min(seg.score), hi.max(seg.score)),
    );
    let range = if max_score > min_score {
        max_score - min_score
    } else {
        1.0
    };

    segments
        .iter()
        .map(|seg| seg.with_score((seg.score - min_score) / range))
        .collect()
}
