//! Read side: what the dashboard shows and how it filters and sorts.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::store::{PlayerId, SeasonId};
use crate::tvi::{StatBundle, TviComponents};

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRow {
    pub id: SeasonId,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub player_id: PlayerId,
    pub team_id: Option<i64>,
    pub player: String,
    pub position: Option<String>,
    pub team: Option<String>,
    pub conference: Option<String>,
    pub tvi: f64,
    pub components: Option<TviComponents>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    /// Empty means every conference.
    pub conferences: Vec<String>,
    /// Empty means every position.
    pub positions: Vec<String>,
    pub min_tvi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonStats {
    pub player_id: PlayerId,
    pub season_id: SeasonId,
    pub team_id: Option<i64>,
    pub stats: StatBundle,
    pub raw_source: Value,
}

/// Newest season first.
pub fn list_seasons(conn: &Connection) -> Result<Vec<SeasonRow>> {
    let mut stmt = conn
        .prepare("SELECT id, year FROM seasons ORDER BY year DESC")
        .context("prepare seasons query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SeasonRow {
                id: row.get(0)?,
                year: row.get(1)?,
            })
        })
        .context("query seasons")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode season row")?);
    }
    Ok(out)
}

pub fn list_conferences(conn: &Connection) -> Result<Vec<String>> {
    distinct_strings(
        conn,
        "SELECT DISTINCT conference FROM teams WHERE conference IS NOT NULL AND conference <> '' ORDER BY conference",
    )
}

pub fn list_positions(conn: &Connection) -> Result<Vec<String>> {
    distinct_strings(
        conn,
        "SELECT DISTINCT position FROM players WHERE position IS NOT NULL AND position <> '' ORDER BY position",
    )
}

fn distinct_strings(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql).context("prepare distinct query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query distinct values")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode distinct value")?);
    }
    Ok(out)
}

/// Scores for one season and model version joined with player and team names.
pub fn load_board(conn: &Connection, season_id: SeasonId, model_version: &str) -> Result<Vec<BoardRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                s.player_id, s.team_id, p.full_name, p.position,
                t.name, t.conference, s.tvi, s.components
            FROM tvi_scores s
            JOIN players p ON p.id = s.player_id
            LEFT JOIN teams t ON t.id = s.team_id
            WHERE s.season_id = ?1 AND s.model_version = ?2
            ORDER BY s.tvi DESC, s.player_id ASC
            "#,
        )
        .context("prepare board query")?;
    let rows = stmt
        .query_map(params![season_id, model_version], |row| {
            let components: String = row.get(7)?;
            Ok(BoardRow {
                player_id: row.get(0)?,
                team_id: row.get(1)?,
                player: row.get(2)?,
                position: row.get(3)?,
                team: row.get(4)?,
                conference: row.get(5)?,
                tvi: row.get(6)?,
                components: serde_json::from_str(&components).ok(),
            })
        })
        .context("query board")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode board row")?);
    }
    Ok(out)
}

/// Applies conference, position, and minimum-TVI filters, then sorts by TVI
/// descending.
pub fn filter_board(rows: Vec<BoardRow>, filter: &BoardFilter) -> Vec<BoardRow> {
    let mut out: Vec<BoardRow> = rows
        .into_iter()
        .filter(|r| {
            filter.conferences.is_empty()
                || r.conference
                    .as_deref()
                    .is_some_and(|c| filter.conferences.iter().any(|f| f == c))
        })
        .filter(|r| {
            filter.positions.is_empty()
                || r.position
                    .as_deref()
                    .is_some_and(|p| filter.positions.iter().any(|f| f == p))
        })
        .filter(|r| filter.min_tvi.is_none_or(|min| r.tvi >= min))
        .collect();
    out.sort_by(|a, b| b.tvi.total_cmp(&a.tvi).then(a.player_id.cmp(&b.player_id)));
    out
}

pub fn load_player_stats(
    conn: &Connection,
    player_id: PlayerId,
    season_id: SeasonId,
) -> Result<Option<PlayerSeasonStats>> {
    conn.query_row(
        r#"
        SELECT
            team_id, games_played, snaps, targets, receptions, yards,
            touchdowns, tackles, pass_breakups, interceptions, raw_source
        FROM player_season_stats
        WHERE player_id = ?1 AND season_id = ?2
        LIMIT 1
        "#,
        params![player_id, season_id],
        |row| {
            let raw: String = row.get(10)?;
            Ok(PlayerSeasonStats {
                player_id,
                season_id,
                team_id: row.get(0)?,
                stats: StatBundle {
                    games_played: row.get(1)?,
                    snaps: row.get(2)?,
                    targets: row.get(3)?,
                    receptions: row.get(4)?,
                    yards: row.get(5)?,
                    touchdowns: row.get(6)?,
                    tackles: row.get(7)?,
                    pass_breakups: row.get(8)?,
                    interceptions: row.get(9)?,
                },
                raw_source: serde_json::from_str(&raw).unwrap_or(Value::Null),
            })
        },
    )
    .optional()
    .context("load player season stats")
}
