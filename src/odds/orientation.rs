//! Decide which stored side the engine treats as player1, and map the
//! resulting odds back onto the stored sides.

use crate::db::models::{HeadToHeadRecord, OddsResult, PlayerOddsProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    /// True when side B is passed to the engine as player1.
    pub swapped: bool,
}

/// Oriented engine inputs borrowed from the stored sides.
pub struct OrientedPair<'a> {
    pub orientation: Orientation,
    pub player1: &'a PlayerOddsProfile,
    pub player2: &'a PlayerOddsProfile,
    /// Head to head from player1's point of view.
    pub h2h: Option<HeadToHeadRecord>,
}

/// The head-to-head leader becomes player1; without a leader the higher
/// rated player does. Ties keep the stored order.
pub fn orient<'a>(
    side_a: &'a PlayerOddsProfile,
    side_b: &'a PlayerOddsProfile,
    h2h_from_a: Option<&HeadToHeadRecord>,
) -> OrientedPair<'a> {
    let swapped = match h2h_from_a {
        Some(h2h) if h2h.wins != h2h.losses => h2h.losses > h2h.wins,
        _ => side_b.ntrp_rating > side_a.ntrp_rating,
    };

    if swapped {
        OrientedPair {
            orientation: Orientation { swapped },
            player1: side_b,
            player2: side_a,
            h2h: h2h_from_a.map(HeadToHeadRecord::mirrored),
        }
    } else {
        OrientedPair {
            orientation: Orientation { swapped },
            player1: side_a,
            player2: side_b,
            h2h: h2h_from_a.cloned(),
        }
    }
}

impl Orientation {
    /// `(odds_a, odds_b)` for the stored sides.
    pub fn map_back(&self, result: &OddsResult) -> (f64, f64) {
        if self.swapped {
            (result.player2_odds, result.player1_odds)
        } else {
            (result.player1_odds, result.player2_odds)
        }
    }
}
