use std::sync::Arc;
use tracing::debug;

use crate::db::models::{FactorBreakdown, HeadToHeadRecord, MatchContext, OddsResult, PlayerOddsProfile};
use crate::errors::{EngineResult, OddsError};

use super::factors::{
    experience_advantage, form_advantage, head_to_head_advantage, momentum_advantage,
    ntrp_advantage, surface_advantage,
};
use super::formatter::{confidence, decimal_odds, recommendations};
use super::uncertainty::{NoNoise, SeededNoise, UncertaintySource, UniformNoise};
use super::weighting::blend_probability;

const LAST5_LEN: usize = 5;

/// Stateless odds calculator. The only injected dependency is the source of
/// uncertainty noise; everything else is a pure function of the inputs.
#[derive(Clone)]
pub struct OddsEngine {
    noise: Arc<dyn UncertaintySource>,
}

impl Default for OddsEngine {
    fn default() -> Self {
        OddsEngine::new(Arc::new(UniformNoise::default()))
    }
}

impl OddsEngine {
    pub fn new(noise: Arc<dyn UncertaintySource>) -> Self {
        OddsEngine { noise }
    }

    /// Engine with a uniform noise band. A zero half-width disables noise;
    /// a seed makes the draws reproducible.
    pub fn with_noise(half_width: f64, seed: Option<u64>) -> EngineResult<Self> {
        let noise: Arc<dyn UncertaintySource> = match (half_width, seed) {
            (w, _) if w == 0.0 => Arc::new(NoNoise),
            (w, Some(seed)) => Arc::new(SeededNoise::new(w, seed)?),
            (w, None) => Arc::new(UniformNoise::new(w)?),
        };
        Ok(OddsEngine::new(noise))
    }

    pub fn noise_half_width(&self) -> f64 {
        self.noise.half_width()
    }

    /// Compute win probabilities, decimal odds, confidence and
    /// recommendations for `p1` against `p2`. `h2h` is from p1's side.
    pub fn compute_odds(
        &self,
        p1: &PlayerOddsProfile,
        p2: &PlayerOddsProfile,
        ctx: &MatchContext,
        h2h: Option<&HeadToHeadRecord>,
    ) -> EngineResult<OddsResult> {
        validate_profile(p1)?;
        validate_profile(p2)?;

        let factors = FactorBreakdown {
            ntrp: ntrp_advantage(p1.ntrp_rating, p2.ntrp_rating),
            form: form_advantage(p1, p2),
            surface: surface_advantage(p1, p2, ctx.surface),
            head_to_head: head_to_head_advantage(h2h, ctx.as_of),
            experience: experience_advantage(p1, p2),
            momentum: momentum_advantage(p1, p2),
        };

        let p1_prob = blend_probability(
            &factors,
            p1.ntrp_rating,
            p2.ntrp_rating,
            h2h,
            self.noise.draw(),
        );
        let p2_prob = 1.0 - p1_prob;

        debug!(
            "Odds {} vs {} on {}: p1={:.4} factors={:?}",
            p1.full_name(),
            p2.full_name(),
            ctx.surface,
            p1_prob,
            factors
        );

        Ok(OddsResult {
            player1_win_probability: p1_prob,
            player2_win_probability: p2_prob,
            player1_odds: decimal_odds(p1_prob),
            player2_odds: decimal_odds(p2_prob),
            confidence: confidence(p1, p2, h2h, &factors),
            recommendations: recommendations(p1, p2, ctx.surface, h2h, &factors),
            factors,
        })
    }
}

fn validate_profile(p: &PlayerOddsProfile) -> EngineResult<()> {
    if p.last5.len() != LAST5_LEN {
        return Err(OddsError::InvalidInput(format!(
            "player {}: last5 must have {} entries, got {}",
            p.id,
            LAST5_LEN,
            p.last5.len()
        )));
    }
    if !p.ntrp_rating.is_finite() || p.ntrp_rating <= 0.0 {
        return Err(OddsError::InvalidInput(format!(
            "player {}: ntrp rating must be finite and positive, got {}",
            p.id, p.ntrp_rating
        )));
    }
    if let Some(rates) = &p.surface_win_rates {
        for (surface, rate) in rates {
            if !rate.is_finite() || !(0.0..=1.0).contains(rate) {
                return Err(OddsError::InvalidInput(format!(
                    "player {}: win rate on {} must be in [0, 1], got {}",
                    p.id, surface, rate
                )));
            }
        }
    }
    Ok(())
}
