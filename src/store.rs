//! Persistence sink: natural-key upserts into SQLite.
//!
//! Every entity row is keyed by a stable natural key so that re-running an
//! ingest over identical inputs rewrites rows in place instead of adding new
//! ones. Timestamps live only in `ingest_runs`.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::ingest::IngestSummary;
use crate::records::{TeamRecord, normalize_key};
use crate::reconcile::{StoredTeam, TeamId};
use crate::tvi::{StatBundle, TviScore};

pub type PlayerId = i64;
pub type SeasonId = i64;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerUpsert {
    pub full_name: String,
    pub position: Option<String>,
    pub height: Option<String>,
    pub weight: Option<u32>,
    pub class_year: Option<String>,
    pub hometown: Option<String>,
    pub previous_team: Option<String>,
    pub external_player_id: Option<String>,
    pub current_team_id: Option<TeamId>,
}

impl PlayerUpsert {
    /// Source id when present; otherwise the full name, which merges
    /// distinct players who share a name.
    pub fn identity_key(&self) -> String {
        match self.external_player_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("ext:{id}"),
            _ => format!("name:{}", normalize_key(&self.full_name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonStatRow {
    pub player_id: PlayerId,
    pub team_id: Option<TeamId>,
    pub season_id: SeasonId,
    pub stats: StatBundle,
    pub raw_source: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TviScoreRow {
    pub player_id: PlayerId,
    pub team_id: Option<TeamId>,
    pub season_id: SeasonId,
    pub score: TviScore,
}

/// Storage handle the ingest pipeline writes through.
pub trait PortalStore {
    fn upsert_teams(&mut self, teams: &[TeamRecord]) -> Result<Vec<StoredTeam>>;

    fn ensure_season(&mut self, year: i32) -> Result<SeasonId>;

    /// Returns the row id, or `None` when the store reports no row back.
    fn upsert_player(&mut self, player: &PlayerUpsert) -> Result<Option<PlayerId>>;

    fn find_player_id_by_name(&self, full_name: &str) -> Result<Option<PlayerId>>;

    fn upsert_season_stats(&mut self, row: &SeasonStatRow) -> Result<()>;

    fn upsert_tvi_score(&mut self, row: &TviScoreRow) -> Result<()>;

    fn record_run(&mut self, _summary: &IngestSummary) -> Result<()> {
        Ok(())
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_key TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            short_name TEXT NULL,
            conference TEXT NULL,
            external_id TEXT NULL,
            logo_url TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_teams_conference ON teams(conference);

        CREATE TABLE IF NOT EXISTS seasons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            year INTEGER NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identity_key TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            position TEXT NULL,
            height TEXT NULL,
            weight INTEGER NULL,
            class_year TEXT NULL,
            hometown TEXT NULL,
            previous_team TEXT NULL,
            external_player_id TEXT NULL,
            current_team_id INTEGER NULL REFERENCES teams(id)
        );
        CREATE INDEX IF NOT EXISTS idx_players_full_name ON players(full_name);
        CREATE INDEX IF NOT EXISTS idx_players_position ON players(position);

        CREATE TABLE IF NOT EXISTS player_season_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NULL REFERENCES teams(id),
            season_id INTEGER NOT NULL REFERENCES seasons(id),
            games_played INTEGER NOT NULL,
            snaps INTEGER NOT NULL,
            targets INTEGER NOT NULL,
            receptions INTEGER NOT NULL,
            yards INTEGER NOT NULL,
            touchdowns INTEGER NOT NULL,
            tackles INTEGER NOT NULL,
            pass_breakups INTEGER NOT NULL,
            interceptions INTEGER NOT NULL,
            raw_source TEXT NOT NULL,
            UNIQUE(player_id, season_id)
        );

        CREATE TABLE IF NOT EXISTS tvi_scores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NULL REFERENCES teams(id),
            season_id INTEGER NOT NULL REFERENCES seasons(id),
            model_version TEXT NOT NULL,
            tvi REAL NOT NULL,
            components TEXT NOT NULL,
            UNIQUE(player_id, season_id, model_version)
        );
        CREATE INDEX IF NOT EXISTS idx_tvi_season ON tvi_scores(season_id);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            year INTEGER NOT NULL,
            model_version TEXT NOT NULL,
            transfers_total INTEGER NOT NULL,
            processed INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            stats_matched INTEGER NOT NULL,
            stat_fetch_failures INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

impl PortalStore for SqliteStore {
    fn upsert_teams(&mut self, teams: &[TeamRecord]) -> Result<Vec<StoredTeam>> {
        let tx = self.conn.transaction().context("begin team transaction")?;
        let mut out = Vec::with_capacity(teams.len());
        for team in teams {
            let id: TeamId = tx
                .query_row(
                    r#"
                    INSERT INTO teams (team_key, name, short_name, conference, external_id, logo_url)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(team_key) DO UPDATE SET
                        name = excluded.name,
                        short_name = excluded.short_name,
                        conference = excluded.conference,
                        external_id = excluded.external_id,
                        logo_url = excluded.logo_url
                    RETURNING id
                    "#,
                    params![
                        team.identity_key(),
                        team.name.trim(),
                        team.short_name,
                        team.conference,
                        team.external_id,
                        team.logo_url,
                    ],
                    |row| row.get(0),
                )
                .with_context(|| format!("upsert team {}", team.name))?;
            out.push(StoredTeam {
                id,
                name: team.name.trim().to_string(),
                short_name: team.short_name.clone(),
                external_id: team.external_id.clone(),
            });
        }
        tx.commit().context("commit team transaction")?;
        Ok(out)
    }

    fn ensure_season(&mut self, year: i32) -> Result<SeasonId> {
        let upserted = self
            .conn
            .query_row(
                "INSERT INTO seasons (year) VALUES (?1)
                 ON CONFLICT(year) DO UPDATE SET year = excluded.year
                 RETURNING id",
                params![year],
                |row| row.get::<_, SeasonId>(0),
            )
            .optional()
            .context("upsert season")?;
        if let Some(id) = upserted {
            return Ok(id);
        }
        self.conn
            .query_row("SELECT id FROM seasons WHERE year = ?1", params![year], |row| {
                row.get(0)
            })
            .with_context(|| format!("look up season {year}"))
    }

    fn upsert_player(&mut self, player: &PlayerUpsert) -> Result<Option<PlayerId>> {
        self.conn
            .query_row(
                r#"
                INSERT INTO players (
                    identity_key, full_name, position, height, weight, class_year,
                    hometown, previous_team, external_player_id, current_team_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(identity_key) DO UPDATE SET
                    full_name = excluded.full_name,
                    position = excluded.position,
                    height = excluded.height,
                    weight = excluded.weight,
                    class_year = excluded.class_year,
                    hometown = excluded.hometown,
                    previous_team = excluded.previous_team,
                    external_player_id = excluded.external_player_id,
                    current_team_id = excluded.current_team_id
                RETURNING id
                "#,
                params![
                    player.identity_key(),
                    player.full_name,
                    player.position,
                    player.height,
                    player.weight,
                    player.class_year,
                    player.hometown,
                    player.previous_team,
                    player.external_player_id,
                    player.current_team_id,
                ],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("upsert player {}", player.full_name))
    }

    fn find_player_id_by_name(&self, full_name: &str) -> Result<Option<PlayerId>> {
        self.conn
            .query_row(
                "SELECT id FROM players WHERE full_name = ?1 ORDER BY id LIMIT 1",
                params![full_name],
                |row| row.get(0),
            )
            .optional()
            .context("look up player by name")
    }

    fn upsert_season_stats(&mut self, row: &SeasonStatRow) -> Result<()> {
        let s = &row.stats;
        let raw = serde_json::to_string(&row.raw_source).context("serialize raw stat source")?;
        self.conn
            .execute(
                r#"
                INSERT INTO player_season_stats (
                    player_id, team_id, season_id,
                    games_played, snaps, targets, receptions, yards,
                    touchdowns, tackles, pass_breakups, interceptions, raw_source
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(player_id, season_id) DO UPDATE SET
                    team_id = excluded.team_id,
                    games_played = excluded.games_played,
                    snaps = excluded.snaps,
                    targets = excluded.targets,
                    receptions = excluded.receptions,
                    yards = excluded.yards,
                    touchdowns = excluded.touchdowns,
                    tackles = excluded.tackles,
                    pass_breakups = excluded.pass_breakups,
                    interceptions = excluded.interceptions,
                    raw_source = excluded.raw_source
                "#,
                params![
                    row.player_id,
                    row.team_id,
                    row.season_id,
                    s.games_played,
                    s.snaps,
                    s.targets,
                    s.receptions,
                    s.yards,
                    s.touchdowns,
                    s.tackles,
                    s.pass_breakups,
                    s.interceptions,
                    raw,
                ],
            )
            .context("upsert season stats")?;
        Ok(())
    }

    fn upsert_tvi_score(&mut self, row: &TviScoreRow) -> Result<()> {
        let components =
            serde_json::to_string(&row.score.components).context("serialize tvi components")?;
        self.conn
            .execute(
                r#"
                INSERT INTO tvi_scores (player_id, team_id, season_id, model_version, tvi, components)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(player_id, season_id, model_version) DO UPDATE SET
                    team_id = excluded.team_id,
                    tvi = excluded.tvi,
                    components = excluded.components
                "#,
                params![
                    row.player_id,
                    row.team_id,
                    row.season_id,
                    row.score.model_version,
                    row.score.tvi,
                    components,
                ],
            )
            .context("upsert tvi score")?;
        Ok(())
    }

    fn record_run(&mut self, summary: &IngestSummary) -> Result<()> {
        let errors_json = serde_json::to_string(&summary.errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "INSERT INTO ingest_runs (
                    started_at, finished_at, year, model_version, transfers_total,
                    processed, skipped, stats_matched, stat_fetch_failures, errors_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    summary.started_at,
                    summary.finished_at,
                    summary.year,
                    summary.model_version,
                    summary.transfers_total as i64,
                    summary.processed as i64,
                    summary.skipped as i64,
                    summary.stats_matched as i64,
                    summary.stat_fetch_failures as i64,
                    errors_json,
                ],
            )
            .context("insert ingest run")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str, id: Option<&str>) -> TeamRecord {
        TeamRecord {
            name: name.to_string(),
            short_name: None,
            conference: Some("SEC".to_string()),
            external_id: id.map(str::to_string),
            logo_url: None,
        }
    }

    #[test]
    fn team_upsert_is_keyed_by_external_id() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = store.upsert_teams(&[team("Alabama", Some("333"))]).unwrap();
        let second = store.upsert_teams(&[team("Alabama Crimson Tide", Some("333"))]).unwrap();
        assert_eq!(first[0].id, second[0].id);
        let (count, name): (i64, String) = store
            .connection()
            .query_row("SELECT COUNT(*), MAX(name) FROM teams", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(name, "Alabama Crimson Tide");
    }

    #[test]
    fn season_is_created_once() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.ensure_season(2024).unwrap();
        let b = store.ensure_season(2024).unwrap();
        let c = store.ensure_season(2025).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn player_upsert_then_name_lookup_agree() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let player = PlayerUpsert {
            full_name: "Jay Cole".to_string(),
            class_year: Some("JR".to_string()),
            ..Default::default()
        };
        let id = store.upsert_player(&player).unwrap().unwrap();
        assert_eq!(store.find_player_id_by_name("Jay Cole").unwrap(), Some(id));
        assert_eq!(store.find_player_id_by_name("Nobody").unwrap(), None);

        let moved = PlayerUpsert {
            class_year: Some("SR".to_string()),
            ..player
        };
        assert_eq!(store.upsert_player(&moved).unwrap(), Some(id));
    }

    #[test]
    fn identity_key_prefers_external_id() {
        let mut p = PlayerUpsert {
            full_name: " Jay Cole ".to_string(),
            external_player_id: Some("77".to_string()),
            ..Default::default()
        };
        assert_eq!(p.identity_key(), "ext:77");
        p.external_player_id = Some("  ".to_string());
        assert_eq!(p.identity_key(), "name:jay cole");
    }
}
