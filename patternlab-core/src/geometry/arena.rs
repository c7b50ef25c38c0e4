//! Index-addressed pivot storage for combinatorial pattern search.
//!
//! Candidate generation walks index pairs and triples over the arena instead
//! of slicing the series repeatedly. The arena is capped at construction, so
//! pair enumeration is at most `cap²/2` and triple enumeration `cap³/6`.

use super::pivots::PivotPoint;

/// Upper bound on pivots kept for pair/triple enumeration.
pub const MAX_ARENA_PIVOTS: usize = 32;

/// Chronologically ordered pivots, addressed by position.
#[derive(Debug, Clone, Default)]
pub struct PivotArena {
    points: Vec<PivotPoint>,
}

impl PivotArena {
    /// Keep at most `cap` pivots, preferring higher significance and then
    /// later dates, and store them in chronological order.
    pub fn capped(mut points: Vec<PivotPoint>, cap: usize) -> Self {
        if points.len() > cap {
            points.sort_by(|a, b| {
                b.significance
                    .total_cmp(&a.significance)
                    .then(b.index.cmp(&a.index))
            });
            points.truncate(cap);
        }
        points.sort_by_key(|p| p.index);
        Self { points }
    }

    pub fn new(points: Vec<PivotPoint>) -> Self {
        Self::capped(points, MAX_ARENA_PIVOTS)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&PivotPoint> {
        self.points.get(id)
    }

    pub fn points(&self) -> &[PivotPoint] {
        &self.points
    }

    /// All `(i, j)` with `i < j`, i.e. chronologically ordered pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.points.len();
        (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
    }

    /// All `(i, j, k)` with `i < j < k`.
    pub fn triples(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let n = self.points.len();
        (0..n).flat_map(move |i| {
            (i + 1..n).flat_map(move |j| (j + 1..n).map(move |k| (i, j, k)))
        })
    }
}
