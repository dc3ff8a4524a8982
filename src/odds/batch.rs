//! Batch calculate-odds process.
//!
//! Every match in a request is an independent unit of work: a missing
//! player or a failed write is reported against that match only and never
//! stops the rest of the batch.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::{MatchContext, MatchStatus};
use crate::db::MatchStore;
use crate::errors::BatchError;

use super::engine::OddsEngine;
use super::orientation::orient;

/// Default per-request match limit.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Odds mapped back onto the stored sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideOdds {
    pub side_a: f64,
    pub side_b: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MatchOddsOutcome {
    Success {
        #[serde(rename = "matchId")]
        match_id: i64,
        odds: SideOdds,
    },
    Failure {
        #[serde(rename = "matchId")]
        match_id: i64,
        error: String,
    },
}

impl MatchOddsOutcome {
    pub fn match_id(&self) -> i64 {
        match self {
            MatchOddsOutcome::Success { match_id, .. } | MatchOddsOutcome::Failure { match_id, .. } => {
                *match_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MatchOddsOutcome::Success { .. })
    }
}

pub struct OddsBatch {
    store: Arc<dyn MatchStore>,
    engine: Arc<OddsEngine>,
    max_batch_size: usize,
}

impl OddsBatch {
    /// A zero limit is raised to 1.
    pub fn new(store: Arc<dyn MatchStore>, engine: Arc<OddsEngine>, max_batch_size: usize) -> Self {
        OddsBatch {
            store,
            engine,
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn validate_request(&self, match_ids: &[i64]) -> Result<(), BatchError> {
        if match_ids.is_empty() {
            return Err(BatchError::Empty);
        }
        if match_ids.len() > self.max_batch_size {
            return Err(BatchError::TooManyMatches {
                requested: match_ids.len(),
                limit: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Compute and persist odds for each match. Results follow request order.
    pub async fn run(&self, match_ids: &[i64]) -> Result<Vec<MatchOddsOutcome>, BatchError> {
        self.validate_request(match_ids)?;

        let jobs = match_ids.iter().map(|&match_id| async move {
            match self.process_match(match_id).await {
                Ok(odds) => {
                    info!(
                        "Odds updated for match {}: A={:.2} B={:.2} (confidence {:.2})",
                        match_id, odds.side_a, odds.side_b, odds.confidence
                    );
                    MatchOddsOutcome::Success { match_id, odds }
                }
                Err(e) => {
                    warn!("Odds calculation failed for match {}: {:#}", match_id, e);
                    MatchOddsOutcome::Failure {
                        match_id,
                        error: format!("{:#}", e),
                    }
                }
            }
        });

        Ok(futures_util::future::join_all(jobs).await)
    }

    /// Recompute every scheduled match, `max_batch_size` at a time.
    pub async fn refresh_scheduled(&self) -> Result<Vec<MatchOddsOutcome>> {
        let ids = self
            .store
            .scheduled_match_ids()
            .await
            .with_context(|| format!("Failed to list scheduled matches from {}", self.store.name()))?;

        let mut outcomes = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.max_batch_size) {
            outcomes.extend(self.run(chunk).await?);
        }
        Ok(outcomes)
    }

    async fn process_match(&self, match_id: i64) -> Result<SideOdds> {
        let m = self.store.load_match(match_id).await?;
        if m.status == MatchStatus::Completed {
            anyhow::bail!("match {} is already completed", match_id);
        }
        if m.player_a_id == m.player_b_id {
            anyhow::bail!("match {} lists player {} on both sides", match_id, m.player_a_id);
        }

        let (side_a, side_b, tournament) = futures_util::try_join!(
            self.store.load_player(m.player_a_id),
            self.store.load_player(m.player_b_id),
            self.store.load_tournament(m.tournament_id),
        )?;
        let h2h = self
            .store
            .head_to_head(side_a.id, side_b.id)
            .await
            .context("head-to-head lookup failed")?;

        let pair = orient(&side_a, &side_b, h2h.as_ref());
        let ctx = MatchContext::now(tournament.surface);
        let result = self
            .engine
            .compute_odds(pair.player1, pair.player2, &ctx, pair.h2h.as_ref())?;

        let (odds_a, odds_b) = pair.orientation.map_back(&result);
        self.store
            .save_odds(match_id, odds_a, odds_b)
            .await
            .with_context(|| format!("failed to save odds for match {}", match_id))?;

        Ok(SideOdds {
            side_a: odds_a,
            side_b: odds_b,
            confidence: result.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MatchRecord, Surface, Tournament};
    use crate::db::test_support::seeded_db;
    use crate::db::Database;
    use crate::odds::test_support::player;
    use crate::odds::uncertainty::NoNoise;
    use approx::assert_relative_eq;

    fn batch_for(db: &Database) -> OddsBatch {
        OddsBatch::new(
            Arc::new(db.clone()),
            Arc::new(OddsEngine::new(Arc::new(NoNoise))),
            DEFAULT_MAX_BATCH_SIZE,
        )
    }

    fn scheduled(id: i64, a: i64, b: i64) -> MatchRecord {
        MatchRecord {
            id,
            tournament_id: 1,
            player_a_id: a,
            player_b_id: b,
            status: MatchStatus::Scheduled,
            winner_id: None,
            played_at: None,
            odds_a: None,
            odds_b: None,
        }
    }

    #[tokio::test]
    async fn computes_and_persists_odds_on_stored_sides() {
        let db = seeded_db();
        let results = batch_for(&db).run(&[10]).await.unwrap();
        assert_eq!(results.len(), 1);
        let MatchOddsOutcome::Success { match_id, odds } = &results[0] else {
            panic!("expected success, got {:?}", results[0]);
        };
        assert_eq!(*match_id, 10);
        assert!(odds.side_a > 1.0 && odds.side_b > 1.0);

        let stored = db.get_match(10).unwrap().unwrap();
        assert_eq!(stored.odds_a, Some(odds.side_a));
        assert_eq!(stored.odds_b, Some(odds.side_b));
    }

    #[tokio::test]
    async fn h2h_leader_is_oriented_then_mapped_back() {
        // Match 10 stores the 4.5 player (id 2) as side A, but player 1 leads
        // their meetings 2-1. The engine sees player 1 first; the stored odds
        // must still line up with the stored sides.
        let db = seeded_db();
        let results = batch_for(&db).run(&[10]).await.unwrap();
        let MatchOddsOutcome::Success { odds, .. } = results[0] else {
            panic!("expected success");
        };

        let p1 = db.get_player(1).unwrap().unwrap();
        let p2 = db.get_player(2).unwrap().unwrap();
        let h2h = db.head_to_head(1, 2).unwrap();
        let direct = OddsEngine::new(Arc::new(NoNoise))
            .compute_odds(&p1, &p2, &MatchContext::now(Surface::Clay), h2h.as_ref())
            .unwrap();
        assert_relative_eq!(odds.side_a, direct.player2_odds);
        assert_relative_eq!(odds.side_b, direct.player1_odds);
        assert!(direct.player1_win_probability > 0.5);
    }

    #[tokio::test]
    async fn one_bad_match_does_not_stop_the_batch() {
        let db = seeded_db();
        let results = batch_for(&db).run(&[999, 10, 1]).await.unwrap();
        assert_eq!(results.iter().map(|r| r.match_id()).collect::<Vec<_>>(), vec![999, 10, 1]);

        match &results[0] {
            MatchOddsOutcome::Failure { error, .. } => assert!(error.contains("match 999 not found")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(results[1].is_success());
        match &results[2] {
            MatchOddsOutcome::Failure { error, .. } => assert!(error.contains("already completed")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(db.get_match(10).unwrap().unwrap().odds_a.is_some());
    }

    #[tokio::test]
    async fn invalid_profile_is_reported_per_match() {
        let db = seeded_db();
        let mut broken = player(3, 4.0);
        broken.ntrp_rating = -1.0;
        db.insert_player(&broken).unwrap();
        db.insert_match(&scheduled(11, 1, 3)).unwrap();

        let results = batch_for(&db).run(&[11, 10]).await.unwrap();
        match &results[0] {
            MatchOddsOutcome::Failure { error, .. } => assert!(error.contains("invalid input"), "{}", error),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(results[1].is_success());
        assert!(db.get_match(11).unwrap().unwrap().odds_a.is_none());
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_requests() {
        let db = seeded_db();
        let batch = batch_for(&db);
        assert_eq!(batch.run(&[]).await.unwrap_err(), BatchError::Empty);
        let ids: Vec<i64> = (1..=11).collect();
        assert_eq!(
            batch.run(&ids).await.unwrap_err(),
            BatchError::TooManyMatches {
                requested: 11,
                limit: 10
            }
        );
    }

    #[tokio::test]
    async fn refresh_covers_every_scheduled_match_in_chunks() {
        let db = seeded_db();
        db.insert_tournament(&Tournament {
            id: 2,
            name: "Grass Cup".into(),
            surface: Surface::Grass,
        })
        .unwrap();
        let mut p3 = player(3, 3.5);
        p3.first_name = "Cal".into();
        db.insert_player(&p3).unwrap();
        for id in 20..25 {
            let mut m = scheduled(id, 1, 3);
            m.tournament_id = 2;
            db.insert_match(&m).unwrap();
        }

        let batch = OddsBatch::new(
            Arc::new(db.clone()),
            Arc::new(OddsEngine::new(Arc::new(NoNoise))),
            2,
        );
        let results = batch.refresh_scheduled().await.unwrap();
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_success()));
        assert!(db.get_match(24).unwrap().unwrap().odds_b.is_some());
    }

    #[tokio::test]
    async fn zero_limit_is_raised_to_one() {
        let db = seeded_db();
        let batch = OddsBatch::new(
            Arc::new(db.clone()),
            Arc::new(OddsEngine::new(Arc::new(NoNoise))),
            0,
        );
        assert_eq!(batch.max_batch_size(), 1);
        let results = batch.refresh_scheduled().await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
    }

    #[test]
    fn outcome_json_shape() {
        let ok = MatchOddsOutcome::Success {
            match_id: 7,
            odds: SideOdds {
                side_a: 1.5,
                side_b: 2.8,
                confidence: 0.75,
            },
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"matchId": 7, "odds": {"sideA": 1.5, "sideB": 2.8, "confidence": 0.75}})
        );
        let err = MatchOddsOutcome::Failure {
            match_id: 8,
            error: "player 3 not found".into(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"matchId": 8, "error": "player 3 not found"})
        );
    }
}
