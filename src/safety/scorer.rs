use crate::{
    safety::{CrimeIndex, CrimeWeightTable},
    structures::ScoringConfig,
};

/// Lowest cost of an edge with crime nearby.
pub const SAFETY_COST_MIN: f64 = 1.0;
/// Cost at and beyond the calibration score.
pub const SAFETY_COST_MAX: f64 = 10.0;

/// Turns crime exposure around a point into a bounded cost.
///
/// Immutable once built and shared by reference between enrichment workers.
pub struct SafetyScorer {
    index: CrimeIndex,
    weights: CrimeWeightTable,
    /// Meters.
    max_distance: f64,
    max_score: f64,
}

impl SafetyScorer {
    pub fn new(
        index: CrimeIndex,
        weights: CrimeWeightTable,
        max_distance: f64,
        max_score: f64,
    ) -> SafetyScorer {
        SafetyScorer {
            index,
            weights,
            max_distance,
            max_score,
        }
    }

    pub fn from_config(index: CrimeIndex, config: &ScoringConfig) -> SafetyScorer {
        SafetyScorer::new(
            index,
            CrimeWeightTable::from_config(config),
            config.max_distance,
            config.max_score,
        )
    }

    /// Weighted crime count at the nearest indexed location, or 0 when that
    /// location is farther than `max_distance`.
    pub fn raw_score(&self, lat: f64, lon: f64) -> f64 {
        let Some((point, dist)) = self.index.nearest_neighbor(lat, lon) else {
            return 0.0;
        };
        if !(dist <= self.max_distance) {
            return 0.0;
        }

        self.index.crimes_at(&point).map_or(0.0, |crimes| {
            crimes
                .iter()
                .map(|(crime_type, &count)| f64::from(count) * self.weights.weight(crime_type))
                .sum()
        })
    }

    pub fn safety_cost(&self, raw: f64) -> f64 {
        safety_cost(raw, self.max_score)
    }

    pub fn point_cost(&self, lat: f64, lon: f64) -> f64 {
        self.safety_cost(self.raw_score(lat, lon))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Maps a raw score into `[1, 10]`, saturating at `max_score`.
pub fn normalize(raw: f64, max_score: f64) -> f64 {
    let ratio = if raw > 0.0 {
        if max_score > 0.0 && max_score.is_finite() {
            (raw / max_score).min(1.0)
        } else {
            1.0
        }
    } else {
        0.0
    };
    round2(1.0 + ratio * 9.0)
}

/// Per-edge cost: 0 with no crime nearby, otherwise the normalized score held
/// within `[SAFETY_COST_MIN, SAFETY_COST_MAX]`.
pub fn safety_cost(raw: f64, max_score: f64) -> f64 {
    if !(raw > 0.0) {
        return 0.0;
    }
    normalize(raw, max_score).clamp(SAFETY_COST_MIN, SAFETY_COST_MAX)
}
