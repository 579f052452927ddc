//! Duration normalization for ranked candidates.

use shortgen_models::DurationBounds;

/// Fit `[start, end]` into `bounds` and `[0, total_duration]`.
///
/// Short windows grow symmetrically by half the deficit on each side
/// (clamped to the media), long windows are recentred on their midpoint and
/// shrunk to exactly `bounds.max`. Returns `None` when nothing non-degenerate
/// is left after clamping. A window already within bounds and inside the
/// media is returned unchanged.
pub fn normalize_duration(
    start: f64,
    end: f64,
    bounds: DurationBounds,
    total_duration: f64,
) -> Option<(f64, f64)> {
    let length = end - start;
    let (mut start, mut end) = (start, end);

    if length < bounds.min {
        let extension = (bounds.min - length) / 2.0;
        start = (start - extension).max(0.0);
        end = (end + extension).min(total_duration);
    } else if length > bounds.max {
        let middle = (start + end) / 2.0;
        let half = bounds.max / 2.0;
        start = middle - half;
        end = middle + half;
    }

    end = end.min(total_duration);
    start = start.max(0.0);

    (start < end).then_some((start, end))
}
