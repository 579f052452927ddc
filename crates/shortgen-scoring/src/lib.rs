//! Highlight scoring core.
//!
//! Three pure, synchronous stages turn heterogeneous time-indexed signals
//! into a ranked set of clip windows:
//!
//! 1. [`normalize`] rescales each signal to `[0, 1]`.
//! 2. [`merge`] aligns sentiment and intensity segments on their time range
//!    and computes a weighted combined score.
//! 3. [`select`] ranks merged segments, clamps them to the configured
//!    duration bounds and falls back to raw scenes, then to uniform slicing,
//!    until the requested highlight count is reached.
//!
//! Nothing here performs I/O, holds shared state or returns errors, so every
//! function can be called concurrently from independent jobs.

pub mod merge;
pub mod normalize;
pub mod select;

pub use merge::{merge, merge_with};
pub use normalize::normalize;
pub use select::{
    normalize_duration, select, HighlightSelector, MergedScoreTier, SceneFallbackTier,
    SelectionContext, SelectionTier, UniformSliceTier, MIN_UNIFORM_WINDOW,
};
