//! Odds, confidence and human-readable recommendations.

use crate::db::models::{FactorBreakdown, HeadToHeadRecord, PlayerOddsProfile, Surface};

use super::factors::surface_win_rate;

/// House edge applied independently to each side.
const BOOKMAKER_MARGIN: f64 = 1.05;
const MIN_CONFIDENCE: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.95;
/// Factor magnitude above which a recommendation is worth mentioning.
const RECOMMENDATION_THRESHOLD: f64 = 0.1;
const MAX_RECOMMENDATIONS: usize = 3;

/// Decimal odds with the bookmaker margin, rounded to cents.
pub fn decimal_odds(probability: f64) -> f64 {
    round2(1.0 / probability * BOOKMAKER_MARGIN)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// How much data backs the estimate, in [0.3, 0.95].
pub fn confidence(
    p1: &PlayerOddsProfile,
    p2: &PlayerOddsProfile,
    h2h: Option<&HeadToHeadRecord>,
    factors: &FactorBreakdown,
) -> f64 {
    let mut confidence: f64 = 0.6;

    let min_matches = p1.total_matches().min(p2.total_matches());
    if min_matches >= 15 {
        confidence += 0.15;
    }
    if min_matches >= 30 {
        confidence += 0.10;
    }
    if p1.surface_win_rates.is_some() && p2.surface_win_rates.is_some() {
        confidence += 0.05;
    }
    if h2h.is_some() {
        confidence += 0.10;
    }

    let signal = factors.ntrp.abs()
        + factors.form.abs()
        + factors.surface.abs()
        + factors.head_to_head.abs();
    if signal > 0.6 {
        confidence += 0.10;
    }
    if signal > 1.0 {
        confidence += 0.05;
    }

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// At most three notes, in priority order: head to head, rating, surface,
/// recent form.
pub fn recommendations(
    p1: &PlayerOddsProfile,
    p2: &PlayerOddsProfile,
    surface: Surface,
    h2h: Option<&HeadToHeadRecord>,
    factors: &FactorBreakdown,
) -> Vec<String> {
    let mut notes = Vec::new();
    let pick = |factor: f64| if factor > 0.0 { (p1, p2) } else { (p2, p1) };

    if factors.head_to_head.abs() > RECOMMENDATION_THRESHOLD {
        if let Some(h2h) = h2h {
            let (leader, _) = pick(factors.head_to_head);
            let (won, lost) = if factors.head_to_head > 0.0 {
                (h2h.wins, h2h.losses)
            } else {
                (h2h.losses, h2h.wins)
            };
            notes.push(format!(
                "{} leads the head-to-head {}-{} in previous meetings",
                leader.full_name(),
                won,
                lost
            ));
        }
    }

    if factors.ntrp.abs() > RECOMMENDATION_THRESHOLD {
        let (stronger, weaker) = pick(factors.ntrp);
        notes.push(format!(
            "{} has the NTRP advantage ({:.1} vs {:.1})",
            stronger.full_name(),
            stronger.ntrp_rating,
            weaker.ntrp_rating
        ));
    }

    if factors.surface.abs() > RECOMMENDATION_THRESHOLD {
        let (specialist, _) = pick(factors.surface);
        if specialist.surface_win_rates.is_some() {
            notes.push(format!(
                "{} wins {:.0}% of matches on {}",
                specialist.full_name(),
                surface_win_rate(specialist, surface) * 100.0,
                surface
            ));
        }
    }

    if factors.form.abs() > RECOMMENDATION_THRESHOLD {
        let (in_form, _) = pick(factors.form);
        notes.push(format!(
            "{} is in better recent form ({}/5 wins in the last five matches)",
            in_form.full_name(),
            in_form.recent_wins()
        ));
    }

    notes.truncate(MAX_RECOMMENDATIONS);
    notes
}
