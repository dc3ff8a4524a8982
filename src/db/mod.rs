use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
pub mod seed;
pub mod store;

use models::*;
pub use store::MatchStore;

/// Thread-safe SQLite connection (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── Players ──────────────────────────────────────────────────────────────

    pub fn get_player(&self, id: i64) -> Result<Option<PlayerOddsProfile>> {
        let conn = self.conn()?;
        let player = conn
            .query_row(
                &format!("SELECT {} FROM players WHERE id = ?1", PLAYER_COLUMNS),
                params![id],
                map_player,
            )
            .optional()?;
        Ok(player)
    }

    /// Upsert a player row
    pub fn insert_player(&self, p: &PlayerOddsProfile) -> Result<()> {
        let surface_rates = p
            .surface_win_rates
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO players ({}) VALUES
                 (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)
                 ON CONFLICT(id) DO UPDATE SET
                    first_name=excluded.first_name,
                    last_name=excluded.last_name,
                    ntrp_rating=excluded.ntrp_rating,
                    wins=excluded.wins,
                    losses=excluded.losses,
                    last5=excluded.last5,
                    current_streak=excluded.current_streak,
                    streak_type=excluded.streak_type,
                    surface_preference=excluded.surface_preference,
                    surface_win_rates=excluded.surface_win_rates,
                    age=excluded.age,
                    hand=excluded.hand,
                    notes=excluded.notes,
                    aggressiveness=excluded.aggressiveness,
                    stamina=excluded.stamina,
                    consistency=excluded.consistency,
                    club=excluded.club,
                    injury_status=excluded.injury_status,
                    seasonal_form=excluded.seasonal_form,
                    last_match_date=excluded.last_match_date",
                PLAYER_COLUMNS
            ),
            params![
                p.id,
                p.first_name,
                p.last_name,
                p.ntrp_rating,
                p.wins,
                p.losses,
                p.last5_string(),
                p.current_streak,
                p.streak_type.as_char().to_string(),
                p.surface_preference.as_str(),
                surface_rates,
                p.age,
                p.hand.as_str(),
                p.notes,
                p.aggressiveness,
                p.stamina,
                p.consistency,
                p.club,
                p.injury_status,
                p.seasonal_form,
                p.last_match_date,
            ],
        )?;
        Ok(())
    }

    // ── Tournaments ──────────────────────────────────────────────────────────

    pub fn get_tournament(&self, id: i64) -> Result<Option<Tournament>> {
        let conn = self.conn()?;
        let tournament = conn
            .query_row(
                "SELECT id, name, surface FROM tournaments WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Tournament {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        surface: parse_text(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(tournament)
    }

    pub fn insert_tournament(&self, t: &Tournament) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tournaments (id, name, surface) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name=excluded.name, surface=excluded.surface",
            params![t.id, t.name, t.surface.as_str()],
        )?;
        Ok(())
    }

    // ── Matches ──────────────────────────────────────────────────────────────

    pub fn get_match(&self, id: i64) -> Result<Option<MatchRecord>> {
        let conn = self.conn()?;
        let m = conn
            .query_row(
                &format!("SELECT {} FROM matches WHERE id = ?1", MATCH_COLUMNS),
                params![id],
                map_match,
            )
            .optional()?;
        Ok(m)
    }

    pub fn insert_match(&self, m: &MatchRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO matches ({}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
                 ON CONFLICT(id) DO UPDATE SET
                    tournament_id=excluded.tournament_id,
                    player_a_id=excluded.player_a_id,
                    player_b_id=excluded.player_b_id,
                    status=excluded.status,
                    winner_id=excluded.winner_id,
                    played_at=excluded.played_at,
                    odds_a=excluded.odds_a,
                    odds_b=excluded.odds_b",
                MATCH_COLUMNS
            ),
            params![
                m.id,
                m.tournament_id,
                m.player_a_id,
                m.player_b_id,
                m.status.as_str(),
                m.winner_id,
                m.played_at,
                m.odds_a,
                m.odds_b,
            ],
        )?;
        Ok(())
    }

    /// List matches, most recent first (unplayed matches last)
    pub fn list_matches(&self, limit: i64) -> Result<Vec<MatchRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM matches ORDER BY played_at IS NULL, played_at DESC, id DESC LIMIT ?1",
            MATCH_COLUMNS
        ))?;
        let matches = stmt
            .query_map(params![limit], map_match)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(matches)
    }

    pub fn list_scheduled_match_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id FROM matches WHERE status = 'scheduled' ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Persist odds for the stored sides A and B
    pub fn update_match_odds(&self, match_id: i64, odds_a: f64, odds_b: f64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE matches SET odds_a = ?1, odds_b = ?2 WHERE id = ?3",
            params![odds_a, odds_b, match_id],
        )?;
        if updated == 0 {
            anyhow::bail!("match {} not found", match_id);
        }
        Ok(())
    }

    // ── Head to head ─────────────────────────────────────────────────────────

    /// Completed meetings between two players, from `player_id`'s side.
    /// Returns `None` when they have never played.
    pub fn head_to_head(&self, player_id: i64, opponent_id: i64) -> Result<Option<HeadToHeadRecord>> {
        let conn = self.conn()?;
        let (wins, losses): (u32, u32) = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN winner_id = ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN winner_id = ?2 THEN 1 ELSE 0 END), 0)
             FROM matches
             WHERE status = 'completed'
               AND ((player_a_id = ?1 AND player_b_id = ?2)
                 OR (player_a_id = ?2 AND player_b_id = ?1))",
            params![player_id, opponent_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if wins == 0 && losses == 0 {
            return Ok(None);
        }

        let last: Option<(Option<i64>, Option<chrono::DateTime<chrono::Utc>>)> = conn
            .query_row(
                "SELECT winner_id, played_at FROM matches
                 WHERE status = 'completed' AND winner_id IS NOT NULL
                   AND ((player_a_id = ?1 AND player_b_id = ?2)
                     OR (player_a_id = ?2 AND player_b_id = ?1))
                 ORDER BY played_at IS NULL, played_at DESC, id DESC LIMIT 1",
                params![player_id, opponent_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (last_winner, last_match_date) = last.unwrap_or((None, None));
        Ok(Some(HeadToHeadRecord {
            wins,
            losses,
            last_match_result: last_winner.map(|w| {
                if w == player_id {
                    Outcome::W
                } else {
                    Outcome::L
                }
            }),
            last_match_date,
        }))
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const PLAYER_COLUMNS: &str = "id, first_name, last_name, ntrp_rating, wins, losses, last5,
    current_streak, streak_type, surface_preference, surface_win_rates, age, hand, notes,
    aggressiveness, stamina, consistency, club, injury_status, seasonal_form, last_match_date";

const MATCH_COLUMNS: &str =
    "id, tournament_id, player_a_id, player_b_id, status, winner_id, played_at, odds_a, odds_b";

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

/// Read a text column and parse it with `FromStr`.
fn parse_text<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn parse_outcome(idx: usize, raw: &str) -> rusqlite::Result<Outcome> {
    let mut chars = raw.chars();
    match (chars.next().and_then(Outcome::from_char), chars.next()) {
        (Some(o), None) => Ok(o),
        _ => Err(conversion_error(idx, format!("invalid outcome '{}'", raw))),
    }
}

fn map_player(row: &rusqlite::Row) -> rusqlite::Result<PlayerOddsProfile> {
    let last5_raw: String = row.get(6)?;
    let last5 = last5_raw
        .chars()
        .map(|c| {
            Outcome::from_char(c).ok_or_else(|| conversion_error(6, format!("invalid outcome '{}'", c)))
        })
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let streak_raw: String = row.get(8)?;
    let rates_raw: Option<String> = row.get(10)?;
    let surface_win_rates = rates_raw
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| conversion_error(10, e.to_string()))?;
    let hand_raw: String = row.get(12)?;
    let hand = match hand_raw.as_str() {
        "left" => Hand::Left,
        "right" => Hand::Right,
        other => return Err(conversion_error(12, format!("invalid hand '{}'", other))),
    };

    Ok(PlayerOddsProfile {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        ntrp_rating: row.get(3)?,
        wins: row.get(4)?,
        losses: row.get(5)?,
        last5,
        current_streak: row.get(7)?,
        streak_type: parse_outcome(8, &streak_raw)?,
        surface_preference: parse_text(row, 9)?,
        surface_win_rates,
        age: row.get(11)?,
        hand,
        notes: row.get(13)?,
        aggressiveness: row.get(14)?,
        stamina: row.get(15)?,
        consistency: row.get(16)?,
        club: row.get(17)?,
        injury_status: row.get(18)?,
        seasonal_form: row.get(19)?,
        last_match_date: row.get(20)?,
    })
}

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        player_a_id: row.get(2)?,
        player_b_id: row.get(3)?,
        status: parse_text(row, 4)?,
        winner_id: row.get(5)?,
        played_at: row.get(6)?,
        odds_a: row.get(7)?,
        odds_b: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id                 INTEGER PRIMARY KEY,
    first_name         TEXT    NOT NULL,
    last_name          TEXT    NOT NULL,
    ntrp_rating        REAL    NOT NULL,
    wins               INTEGER NOT NULL DEFAULT 0,
    losses             INTEGER NOT NULL DEFAULT 0,
    last5              TEXT    NOT NULL,
    current_streak     INTEGER NOT NULL DEFAULT 0,
    streak_type        TEXT    NOT NULL DEFAULT 'W',
    surface_preference TEXT    NOT NULL,
    surface_win_rates  TEXT,
    age                INTEGER NOT NULL,
    hand               TEXT    NOT NULL DEFAULT 'right',
    notes              TEXT,
    aggressiveness     REAL,
    stamina            REAL,
    consistency        REAL,
    club               TEXT,
    injury_status      TEXT,
    seasonal_form      REAL,
    last_match_date    TEXT
);

CREATE TABLE IF NOT EXISTS tournaments (
    id      INTEGER PRIMARY KEY,
    name    TEXT    NOT NULL,
    surface TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS matches (
    id            INTEGER PRIMARY KEY,
    tournament_id INTEGER NOT NULL,
    player_a_id   INTEGER NOT NULL,
    player_b_id   INTEGER NOT NULL,
    status        TEXT    NOT NULL DEFAULT 'scheduled',
    winner_id     INTEGER,
    played_at     TEXT,
    odds_a        REAL,
    odds_b        REAL,
    FOREIGN KEY (tournament_id) REFERENCES tournaments(id),
    FOREIGN KEY (player_a_id)   REFERENCES players(id),
    FOREIGN KEY (player_b_id)   REFERENCES players(id)
);

CREATE INDEX IF NOT EXISTS idx_matches_status  ON matches(status);
CREATE INDEX IF NOT EXISTS idx_matches_players ON matches(player_a_id, player_b_id);
"#;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::odds::test_support::player;
    use chrono::{Duration, Utc};

    /// In-memory database with two players, one tournament and history:
    /// player 1 beat player 2 twice and lost once, most recently a win.
    /// Match 10 is the upcoming fixture.
    pub fn seeded_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        let mut p1 = player(1, 4.0);
        p1.first_name = "Ana".into();
        p1.last_name = "Ruiz".into();
        let mut p2 = player(2, 4.5);
        p2.first_name = "Bea".into();
        p2.last_name = "Kim".into();
        db.insert_player(&p1).unwrap();
        db.insert_player(&p2).unwrap();
        db.insert_tournament(&Tournament {
            id: 1,
            name: "Spring Open".into(),
            surface: Surface::Clay,
        })
        .unwrap();

        let now = Utc::now();
        for (id, a, b, winner, days_ago) in [(1, 1, 2, 1, 300), (2, 2, 1, 2, 200), (3, 2, 1, 1, 30)] {
            db.insert_match(&MatchRecord {
                id,
                tournament_id: 1,
                player_a_id: a,
                player_b_id: b,
                status: MatchStatus::Completed,
                winner_id: Some(winner),
                played_at: Some(now - Duration::days(days_ago)),
                odds_a: None,
                odds_b: None,
            })
            .unwrap();
        }
        db.insert_match(&MatchRecord {
            id: 10,
            tournament_id: 1,
            player_a_id: 2,
            player_b_id: 1,
            status: MatchStatus::Scheduled,
            winner_id: None,
            played_at: None,
            odds_a: None,
            odds_b: None,
        })
        .unwrap();
        db
    }
}
