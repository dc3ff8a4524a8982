//! Weight allocation and score blending.
//!
//! Weights are dynamic: the NTRP factor takes a larger share as the rating
//! gap widens and as the competitive level rises, and the head-to-head
//! factor only gets weight when the players have actually met.
//!
//! Blending order is fixed: weighted sum, head-to-head Bayesian blend,
//! uncertainty, head-to-head floor/ceiling tilt, then the bound clamp last.

use crate::db::models::{FactorBreakdown, HeadToHeadRecord};

/// Minimum prior meetings before head-to-head history overrides the model.
const H2H_BLEND_MIN_MATCHES: u64 = 2;
const MAX_BLEND_STRENGTH: f64 = 0.85;
const MAX_TILT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub ntrp: f64,
    pub head_to_head: f64,
    /// Shared weight for each of form, surface, experience and momentum.
    pub other: f64,
}

pub fn ntrp_weight(ntrp_diff: f64, base: f64) -> f64 {
    if ntrp_diff >= 1.5 {
        if base >= 4.0 {
            0.6
        } else {
            0.55
        }
    } else if ntrp_diff >= 1.0 {
        if base >= 4.0 {
            0.55
        } else if base >= 3.5 {
            0.5
        } else {
            0.45
        }
    } else if ntrp_diff >= 0.5 {
        0.35
    } else {
        0.25
    }
}

pub fn allocate_weights(rating1: f64, rating2: f64, h2h_matches: u64) -> FactorWeights {
    let ntrp_diff = (rating1 - rating2).abs();
    let base = rating1.min(rating2);

    let ntrp = ntrp_weight(ntrp_diff, base);
    let remaining = 1.0 - ntrp;

    let head_to_head = if h2h_matches > 0 {
        let depth = 0.08 + (h2h_matches as f64 * 0.02).min(0.12);
        (remaining * 0.4).min(depth.min(0.2))
    } else {
        0.0
    };

    let other = (remaining - head_to_head).max(0.0) / 4.0;

    FactorWeights {
        ntrp,
        head_to_head,
        other,
    }
}

/// Allowed probability range for player1, widening with the rating gap.
pub fn probability_bounds(ntrp_diff: f64) -> (f64, f64) {
    if ntrp_diff < 0.2 {
        (0.35, 0.65)
    } else if ntrp_diff < 0.35 {
        (0.3, 0.7)
    } else if ntrp_diff >= 1.5 {
        (0.05, 0.95)
    } else if ntrp_diff >= 1.0 {
        (0.1, 0.9)
    } else if ntrp_diff >= 0.5 {
        (0.15, 0.85)
    } else {
        (0.2, 0.8)
    }
}

pub fn weighted_score(factors: &FactorBreakdown, weights: &FactorWeights) -> f64 {
    0.5 + factors.ntrp * weights.ntrp
        + factors.form * weights.other
        + factors.surface * weights.other
        + factors.experience * weights.other
        + factors.momentum * weights.other
        + factors.head_to_head * weights.head_to_head
}

/// Pull the score toward the observed head-to-head win rate. Close ratings
/// let history dominate more.
pub fn bayesian_h2h_blend(score: f64, h2h: &HeadToHeadRecord, ntrp_diff: f64) -> f64 {
    let total = h2h.total();
    if total < H2H_BLEND_MIN_MATCHES {
        return score;
    }
    let h2h_win_rate = h2h.wins as f64 / total as f64;
    let rating_diff_adjustment = if ntrp_diff <= 0.5 {
        1.0 - ntrp_diff * 0.8
    } else {
        0.6
    };
    let blend_strength =
        ((0.25 + total as f64 * 0.08) * rating_diff_adjustment).clamp(0.0, MAX_BLEND_STRENGTH);
    score * (1.0 - blend_strength) + h2h_win_rate * blend_strength
}

/// Keep the head-to-head leader on its side of 50%.
pub fn h2h_tilt(score: f64, h2h: &HeadToHeadRecord) -> f64 {
    let total = h2h.total();
    if total < H2H_BLEND_MIN_MATCHES || h2h.wins == h2h.losses {
        return score;
    }
    let margin = h2h.wins.abs_diff(h2h.losses) as f64;
    let tilt = (margin * 0.025 + total as f64 * 0.01).min(MAX_TILT);
    if h2h.wins > h2h.losses {
        score.max(0.5 + tilt)
    } else {
        score.min(0.5 - tilt)
    }
}

/// Player1 win probability from the factor values. `noise` is the already
/// drawn uncertainty offset.
pub fn blend_probability(
    factors: &FactorBreakdown,
    rating1: f64,
    rating2: f64,
    h2h: Option<&HeadToHeadRecord>,
    noise: f64,
) -> f64 {
    let ntrp_diff = (rating1 - rating2).abs();
    let weights = allocate_weights(rating1, rating2, h2h.map(|r| r.total()).unwrap_or(0));

    let mut score = weighted_score(factors, &weights);
    if let Some(h2h) = h2h {
        score = bayesian_h2h_blend(score, h2h, ntrp_diff);
    }
    score += noise;
    if let Some(h2h) = h2h {
        score = h2h_tilt(score, h2h);
    }

    let (lo, hi) = probability_bounds(ntrp_diff);
    score.clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(wins: u32, losses: u32) -> HeadToHeadRecord {
        HeadToHeadRecord {
            wins,
            losses,
            ..Default::default()
        }
    }

    #[test]
    fn ntrp_weight_brackets() {
        assert_relative_eq!(ntrp_weight(1.6, 4.0), 0.6);
        assert_relative_eq!(ntrp_weight(1.6, 3.0), 0.55);
        assert_relative_eq!(ntrp_weight(1.2, 4.2), 0.55);
        assert_relative_eq!(ntrp_weight(1.2, 3.6), 0.5);
        assert_relative_eq!(ntrp_weight(1.2, 3.0), 0.45);
        assert_relative_eq!(ntrp_weight(0.7, 5.0), 0.35);
        assert_relative_eq!(ntrp_weight(0.2, 5.0), 0.25);
    }

    #[test]
    fn weights_sum_to_one() {
        for (r1, r2, n) in [(4.0, 4.0, 0), (5.0, 3.5, 0), (4.0, 4.0, 5), (6.0, 4.0, 30), (3.0, 3.6, 1)] {
            let w = allocate_weights(r1, r2, n);
            let sum = w.ntrp + w.head_to_head + 4.0 * w.other;
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn h2h_weight_grows_with_meetings_and_caps() {
        assert_eq!(allocate_weights(4.0, 4.0, 0).head_to_head, 0.0);
        assert_relative_eq!(allocate_weights(4.0, 4.0, 1).head_to_head, 0.10, epsilon = 1e-12);
        assert_relative_eq!(allocate_weights(4.0, 4.0, 5).head_to_head, 0.18, epsilon = 1e-12);
        assert_relative_eq!(allocate_weights(4.0, 4.0, 50).head_to_head, 0.20, epsilon = 1e-12);
        // remaining 0.4 * 0.4 = 0.16 caps below the depth term
        assert_relative_eq!(allocate_weights(6.0, 4.0, 50).head_to_head, 0.16, epsilon = 1e-12);
    }

    #[test]
    fn bounds_by_gap() {
        assert_eq!(probability_bounds(0.0), (0.35, 0.65));
        assert_eq!(probability_bounds(0.3), (0.3, 0.7));
        assert_eq!(probability_bounds(0.4), (0.2, 0.8));
        assert_eq!(probability_bounds(0.5), (0.15, 0.85));
        assert_eq!(probability_bounds(1.0), (0.1, 0.9));
        assert_eq!(probability_bounds(2.0), (0.05, 0.95));
    }

    #[test]
    fn bayesian_blend_needs_two_meetings() {
        assert_relative_eq!(bayesian_h2h_blend(0.6, &record(1, 0), 0.0), 0.6);
        // strength = 0.25 + 0.16 = 0.41
        assert_relative_eq!(
            bayesian_h2h_blend(0.6, &record(2, 0), 0.0),
            0.6 * 0.59 + 1.0 * 0.41,
            epsilon = 1e-12
        );
        // large gap uses a flat 0.6 adjustment
        assert_relative_eq!(
            bayesian_h2h_blend(0.6, &record(0, 2), 1.0),
            0.6 * (1.0 - 0.41 * 0.6),
            epsilon = 1e-12
        );
    }

    #[test]
    fn tilt_floors_and_caps() {
        // tilt = 3 * 0.025 + 3 * 0.01 = 0.105
        assert_relative_eq!(h2h_tilt(0.45, &record(3, 0)), 0.605, epsilon = 1e-12);
        assert_relative_eq!(h2h_tilt(0.70, &record(3, 0)), 0.70, epsilon = 1e-12);
        assert_relative_eq!(h2h_tilt(0.55, &record(0, 3)), 0.395, epsilon = 1e-12);
        assert_relative_eq!(h2h_tilt(0.55, &record(2, 2)), 0.55);
        assert_relative_eq!(h2h_tilt(0.55, &record(0, 40)), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn clamp_runs_after_tilt() {
        // Equal ratings: bounds [0.35, 0.65]. The 0-3 tilt would cap at 0.395,
        // the blend pulls lower, and the bound clamp lifts the result to 0.35.
        let factors = FactorBreakdown::default();
        let p = blend_probability(&factors, 4.0, 4.0, Some(&record(0, 3)), 0.0);
        assert_relative_eq!(p, 0.35, epsilon = 1e-12);
    }

    #[test]
    fn noise_applies_before_tilt() {
        let factors = FactorBreakdown::default();
        // Without h2h, neutral factors and noise land on 0.5 + noise.
        let p = blend_probability(&factors, 4.0, 4.0, None, 0.02);
        assert_relative_eq!(p, 0.52, epsilon = 1e-12);
        // A 2-0 record keeps player1 above the 0.57 floor despite negative noise.
        let h2h = record(2, 0);
        let p = blend_probability(&factors, 4.0, 4.0, Some(&h2h), -0.025);
        assert!(p >= 0.5 + 0.07 - 1e-12, "got {}", p);
    }
}
