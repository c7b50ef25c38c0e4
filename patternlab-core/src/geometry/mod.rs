//! Pivot and clustering utilities shared by the pattern strategies.

pub mod arena;
pub mod cluster;
pub mod levels;
pub mod pivots;

pub use arena::{PivotArena, MAX_ARENA_PIVOTS};
pub use cluster::{cluster_levels, PriceCluster};
pub use levels::{
    collect_touches, enforce_alternation, strictly_alternates, support_resistance,
    LevelCandidates, Touch, TouchKind,
};
pub use pivots::{
    adaptive_window, retain_recent, scan_highs, scan_lows, PivotKind, PivotPoint, Strictness,
};

/// Tolerance used for threshold comparisons, so values like exactly 20% are
/// not lost to floating-point noise.
pub const EPS: f64 = 1e-9;
