use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Playing surface. Serialized with the display names used by tournaments
/// and by `surface_win_rates` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Surface {
    #[serde(rename = "Hard Court")]
    Hard,
    #[serde(rename = "Clay Court")]
    Clay,
    #[serde(rename = "Grass Court")]
    Grass,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Hard => "Hard Court",
            Surface::Clay => "Clay Court",
            Surface::Grass => "Grass Court",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hard court" | "hard" => Ok(Surface::Hard),
            "clay court" | "clay" => Ok(Surface::Clay),
            "grass court" | "grass" => Ok(Surface::Grass),
            other => Err(format!("unknown surface '{}'", other)),
        }
    }
}

/// A single match outcome: win or loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    W,
    L,
}

impl Outcome {
    pub fn is_win(self) -> bool {
        self == Outcome::W
    }

    /// The same result seen from the opponent's side.
    pub fn inverted(self) -> Self {
        match self {
            Outcome::W => Outcome::L,
            Outcome::L => Outcome::W,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Outcome::W => 'W',
            Outcome::L => 'L',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'W' => Some(Outcome::W),
            'L' => Some(Outcome::L),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

/// Player snapshot consumed by the odds engine.
///
/// Only rating, record, recent form, streak, surface data and age feed the
/// factor math. The remaining attributes are carried for display and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOddsProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub ntrp_rating: f64,
    pub wins: u32,
    pub losses: u32,
    /// Most recent first. Exactly five entries.
    pub last5: Vec<Outcome>,
    pub current_streak: u32,
    pub streak_type: Outcome,
    pub surface_preference: Surface,
    /// Win rate per surface in [0, 1]. Missing entries count as 0.5.
    #[serde(default)]
    pub surface_win_rates: Option<BTreeMap<Surface, f64>>,
    pub age: u32,
    pub hand: Hand,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub aggressiveness: Option<f64>,
    #[serde(default)]
    pub stamina: Option<f64>,
    #[serde(default)]
    pub consistency: Option<f64>,
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub injury_status: Option<String>,
    #[serde(default)]
    pub seasonal_form: Option<f64>,
    #[serde(default)]
    pub last_match_date: Option<DateTime<Utc>>,
}

impl PlayerOddsProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn total_matches(&self) -> u64 {
        u64::from(self.wins) + u64::from(self.losses)
    }

    pub fn recent_wins(&self) -> usize {
        self.last5.iter().filter(|o| o.is_win()).count()
    }

    /// `last5` as stored in the database, e.g. "WWLWL".
    pub fn last5_string(&self) -> String {
        self.last5.iter().map(|o| o.as_char()).collect()
    }
}

/// Prior meetings between two players, from player1's point of view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadToHeadRecord {
    pub wins: u32,
    pub losses: u32,
    #[serde(default)]
    pub last_match_result: Option<Outcome>,
    #[serde(default)]
    pub last_match_date: Option<DateTime<Utc>>,
}

impl HeadToHeadRecord {
    pub fn total(&self) -> u64 {
        u64::from(self.wins) + u64::from(self.losses)
    }

    /// The same record seen from the other player's side.
    pub fn mirrored(&self) -> Self {
        HeadToHeadRecord {
            wins: self.losses,
            losses: self.wins,
            last_match_result: self.last_match_result.map(Outcome::inverted),
            last_match_date: self.last_match_date,
        }
    }
}

/// Match-level context for a single odds computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchContext {
    pub surface: Surface,
    /// Reference time for head-to-head recency.
    pub as_of: DateTime<Utc>,
}

impl MatchContext {
    pub fn now(surface: Surface) -> Self {
        MatchContext {
            surface,
            as_of: Utc::now(),
        }
    }
}

/// The six signed factor values, each in (-1, 1). Positive favors player1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorBreakdown {
    pub ntrp: f64,
    pub form: f64,
    pub surface: f64,
    pub head_to_head: f64,
    pub experience: f64,
    pub momentum: f64,
}

/// Engine output for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsResult {
    pub player1_win_probability: f64,
    pub player2_win_probability: f64,
    pub player1_odds: f64,
    pub player2_odds: f64,
    pub confidence: f64,
    pub factors: FactorBreakdown,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub surface: Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Completed => "completed",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(format!("unknown match status '{}'", other)),
        }
    }
}

/// A match row. Sides A and B are the stored order, independent of which
/// player the engine treats as player1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: i64,
    pub tournament_id: i64,
    pub player_a_id: i64,
    pub player_b_id: i64,
    pub status: MatchStatus,
    #[serde(default)]
    pub winner_id: Option<i64>,
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub odds_a: Option<f64>,
    #[serde(default)]
    pub odds_b: Option<f64>,
}
