//! Factor extractors.
//!
//! Each extractor compares player1 against player2 along one dimension and
//! returns a signed value in (-1, 1), positive favoring player1. Raw
//! differences are squashed with `tanh` so large gaps saturate instead of
//! diverging.

use chrono::{DateTime, Utc};

use crate::db::models::{HeadToHeadRecord, Outcome, PlayerOddsProfile, Surface};

// ── NTRP rating ──────────────────────────────────────────────────────────────

/// Below this gap two ratings are treated as equal.
const EQUAL_RATING_EPS: f64 = 0.01;
/// Gaps at or above this use the linear, clamped branch.
const LARGE_GAP: f64 = 1.0;
const LARGE_GAP_CAP: f64 = 0.8;

/// Skill gap advantage. The multiplier scales with the weaker player's level:
/// a full point at 4.5 is far more decisive than a full point at 2.5.
pub fn ntrp_advantage(rating1: f64, rating2: f64) -> f64 {
    let diff = rating1 - rating2;
    let base = rating1.min(rating2);

    if diff.abs() < EQUAL_RATING_EPS {
        return (diff * 0.1).tanh();
    }

    if diff.abs() >= LARGE_GAP {
        let multiplier = if base >= 4.5 {
            3.5
        } else if base >= 4.0 {
            3.0
        } else if base >= 3.5 {
            2.5
        } else {
            2.0
        };
        return (diff * multiplier).clamp(-LARGE_GAP_CAP, LARGE_GAP_CAP);
    }

    let multiplier = if base >= 4.5 {
        1.2
    } else if base >= 4.0 {
        1.0
    } else if base >= 3.5 {
        0.8
    } else {
        0.6
    };
    (diff * multiplier).tanh()
}

// ── Form ─────────────────────────────────────────────────────────────────────

/// Positional weights for `last5`, most recent first.
const RECENT_WEIGHTS: [f64; 5] = [0.4, 0.25, 0.2, 0.1, 0.05];
/// Records shorter than this are shrunk toward 50%.
const SHRINKAGE_MIN_MATCHES: u64 = 10;

/// Career win rate, with a 5-5 prior for thin records.
pub fn long_run_win_rate(wins: u32, losses: u32) -> f64 {
    let matches = u64::from(wins) + u64::from(losses);
    if matches < SHRINKAGE_MIN_MATCHES {
        (wins as f64 + 5.0) / (matches as f64 + 10.0)
    } else {
        wins as f64 / matches as f64
    }
}

/// Weighted share of recent wins in [0, 1].
pub fn recent_form_score(last5: &[Outcome]) -> f64 {
    last5
        .iter()
        .zip(RECENT_WEIGHTS.iter())
        .filter(|(o, _)| o.is_win())
        .map(|(_, w)| w)
        .sum()
}

pub fn form_advantage(p1: &PlayerOddsProfile, p2: &PlayerOddsProfile) -> f64 {
    let matches1 = p1.total_matches();
    let matches2 = p2.total_matches();

    // More history on the court means the recent streak is trusted more.
    let recent_weight = ((matches1 + matches2) as f64 / 40.0).clamp(0.5, 0.8);

    let form = |p: &PlayerOddsProfile| {
        recent_form_score(&p.last5) * recent_weight
            + long_run_win_rate(p.wins, p.losses) * (1.0 - recent_weight)
    };

    ((form(p1) - form(p2)) * 1.5).tanh()
}

// ── Surface ──────────────────────────────────────────────────────────────────

const DEFAULT_SURFACE_RATE: f64 = 0.5;
const PREFERRED_SURFACE_RATE: f64 = 0.65;
const OTHER_SURFACE_RATE: f64 = 0.35;

/// Win rate on `surface`. Players without per-surface data fall back to a
/// binary preferred / not-preferred signal.
pub fn surface_win_rate(player: &PlayerOddsProfile, surface: Surface) -> f64 {
    match &player.surface_win_rates {
        Some(rates) => rates.get(&surface).copied().unwrap_or(DEFAULT_SURFACE_RATE),
        None if player.surface_preference == surface => PREFERRED_SURFACE_RATE,
        None => OTHER_SURFACE_RATE,
    }
}

pub fn surface_advantage(p1: &PlayerOddsProfile, p2: &PlayerOddsProfile, surface: Surface) -> f64 {
    let diff = surface_win_rate(p1, surface) - surface_win_rate(p2, surface);
    (diff * 0.3).tanh()
}

// ── Head to head ─────────────────────────────────────────────────────────────

const RECENCY_WINDOW_DAYS: i64 = 180;
const RECENCY_BONUS: f64 = 0.05;
const VOLUME_BOOST_PER_MATCH: f64 = 0.05;
const VOLUME_BOOST_CAP: f64 = 0.4;

pub fn head_to_head_advantage(h2h: Option<&HeadToHeadRecord>, as_of: DateTime<Utc>) -> f64 {
    let Some(h2h) = h2h else {
        return 0.0;
    };
    let total = h2h.total();
    if total == 0 {
        return 0.0;
    }

    let win_rate = h2h.wins as f64 / total as f64;

    let recent = h2h
        .last_match_date
        .map(|d| (0..=RECENCY_WINDOW_DAYS).contains(&(as_of - d).num_days()))
        .unwrap_or(false);
    let recency_bonus = match (h2h.last_match_result, recent) {
        (Some(Outcome::W), true) => RECENCY_BONUS,
        (Some(Outcome::L), true) => -RECENCY_BONUS,
        _ => 0.0,
    };

    let volume_boost = (total as f64 * VOLUME_BOOST_PER_MATCH).min(VOLUME_BOOST_CAP);
    let raw = (win_rate - 0.5) * (0.8 + volume_boost) + recency_bonus;
    (raw * 1.1).tanh()
}

// ── Experience ───────────────────────────────────────────────────────────────

pub fn experience_score(player: &PlayerOddsProfile) -> f64 {
    player.age as f64 * 0.3 + player.total_matches() as f64 * 0.7
}

pub fn experience_advantage(p1: &PlayerOddsProfile, p2: &PlayerOddsProfile) -> f64 {
    ((experience_score(p1) - experience_score(p2)) * 0.005).tanh()
}

// ── Momentum ─────────────────────────────────────────────────────────────────

/// Signed streak strength with diminishing returns.
pub fn momentum(player: &PlayerOddsProfile) -> f64 {
    let magnitude = (player.current_streak as f64).sqrt();
    match player.streak_type {
        Outcome::W => magnitude,
        Outcome::L => -magnitude,
    }
}

pub fn momentum_advantage(p1: &PlayerOddsProfile, p2: &PlayerOddsProfile) -> f64 {
    ((momentum(p1) - momentum(p2)) * 0.15).tanh()
}

// ── Tests ────────────────────────────────────────────────────────────────────
