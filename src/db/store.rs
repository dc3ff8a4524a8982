use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::models::{HeadToHeadRecord, MatchRecord, PlayerOddsProfile, Tournament};
use super::Database;

/// Data source and sink for the calculate-odds process. Lookups here are the
/// only place an odds computation may wait on I/O.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn load_match(&self, match_id: i64) -> Result<MatchRecord>;

    async fn load_player(&self, player_id: i64) -> Result<PlayerOddsProfile>;

    async fn load_tournament(&self, tournament_id: i64) -> Result<Tournament>;

    /// Prior meetings from `player_id`'s side, or `None` if they never met.
    async fn head_to_head(&self, player_id: i64, opponent_id: i64) -> Result<Option<HeadToHeadRecord>>;

    /// Persist odds onto the stored sides of a match.
    async fn save_odds(&self, match_id: i64, odds_a: f64, odds_b: f64) -> Result<()>;

    /// Matches still awaiting a result, in id order.
    async fn scheduled_match_ids(&self) -> Result<Vec<i64>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl MatchStore for Database {
    async fn load_match(&self, match_id: i64) -> Result<MatchRecord> {
        self.get_match(match_id)?
            .ok_or_else(|| anyhow!("match {} not found", match_id))
    }

    async fn load_player(&self, player_id: i64) -> Result<PlayerOddsProfile> {
        self.get_player(player_id)?
            .ok_or_else(|| anyhow!("player {} not found", player_id))
    }

    async fn load_tournament(&self, tournament_id: i64) -> Result<Tournament> {
        self.get_tournament(tournament_id)?
            .ok_or_else(|| anyhow!("tournament {} not found", tournament_id))
    }

    async fn head_to_head(&self, player_id: i64, opponent_id: i64) -> Result<Option<HeadToHeadRecord>> {
        Database::head_to_head(self, player_id, opponent_id)
    }

    async fn save_odds(&self, match_id: i64, odds_a: f64, odds_b: f64) -> Result<()> {
        self.update_match_odds(match_id, odds_a, odds_b)
    }

    async fn scheduled_match_ids(&self) -> Result<Vec<i64>> {
        self.list_scheduled_match_ids()
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
