//! Additive confidence scoring.
//!
//! Each strategy starts from a base value and adds bounded bonuses. Tier
//! helpers award the first matching tier only. The final score is clamped to
//! [0, 100].

/// Running confidence score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence {
    score: f64,
}

impl Confidence {
    pub fn base(score: f64) -> Self {
        Self { score }
    }

    pub fn add(&mut self, points: f64) -> &mut Self {
        if points.is_finite() {
            self.score += points;
        }
        self
    }

    pub fn add_if(&mut self, condition: bool, points: f64) -> &mut Self {
        if condition {
            self.add(points);
        }
        self
    }

    /// First tier whose threshold `value` strictly exceeds.
    pub fn tier_above(&mut self, value: f64, tiers: &[(f64, f64)]) -> &mut Self {
        if let Some(&(_, pts)) = tiers.iter().find(|(t, _)| value > *t) {
            self.add(pts);
        }
        self
    }

    /// First tier whose threshold `value` meets or exceeds.
    pub fn tier_at_least(&mut self, value: f64, tiers: &[(f64, f64)]) -> &mut Self {
        if let Some(&(_, pts)) = tiers.iter().find(|(t, _)| value >= *t) {
            self.add(pts);
        }
        self
    }

    /// First tier whose threshold `value` is at or below.
    pub fn tier_at_most(&mut self, value: f64, tiers: &[(f64, f64)]) -> &mut Self {
        if let Some(&(_, pts)) = tiers.iter().find(|(t, _)| value <= *t) {
            self.add(pts);
        }
        self
    }

    /// First tier whose threshold `value` is strictly below.
    pub fn tier_below(&mut self, value: f64, tiers: &[(f64, f64)]) -> &mut Self {
        if let Some(&(_, pts)) = tiers.iter().find(|(t, _)| value < *t) {
            self.add(pts);
        }
        self
    }

    /// Raw, unclamped score.
    pub fn raw(&self) -> f64 {
        self.score
    }

    /// Score clamped to [0, 100] and truncated to an integer.
    pub fn finish(&self) -> u8 {
        self.score.clamp(0.0, 100.0) as u8
    }
}
