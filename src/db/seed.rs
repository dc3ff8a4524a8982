//! JSON import of players, tournaments and matches.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::models::{MatchRecord, PlayerOddsProfile, Tournament};
use super::Database;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub players: Vec<PlayerOddsProfile>,
    #[serde(default)]
    pub tournaments: Vec<Tournament>,
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))
    }
}

impl Database {
    /// Insert every seed row (players, then tournaments, then matches).
    /// Existing rows with the same id are replaced. Returns rows written.
    pub fn import_seed(&self, seed: &SeedFile) -> Result<usize> {
        for p in &seed.players {
            self.insert_player(p)
                .with_context(|| format!("Failed to import player {}", p.id))?;
        }
        for t in &seed.tournaments {
            self.insert_tournament(t)
                .with_context(|| format!("Failed to import tournament {}", t.id))?;
        }
        for m in &seed.matches {
            self.insert_match(m)
                .with_context(|| format!("Failed to import match {}", m.id))?;
        }
        Ok(seed.players.len() + seed.tournaments.len() + seed.matches.len())
    }
}
