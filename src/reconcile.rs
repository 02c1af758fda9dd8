//! Cross-source matching: team affiliation, a player's stat line, and
//! coalescing heterogeneous stat field names into a [`StatBundle`].

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::records::{StatRecord, TransferRecord, normalize_key};
use crate::tvi::StatBundle;

pub type TeamId = i64;

/// A team row as stored, enough to build a lookup index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTeam {
    pub id: TeamId,
    pub name: String,
    pub short_name: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TeamIndex {
    by_external_id: HashMap<String, TeamId>,
    by_name: HashMap<String, TeamId>,
}

impl TeamIndex {
    pub fn build(teams: &[StoredTeam]) -> Self {
        let mut index = Self::default();
        for team in teams {
            if let Some(id) = team.external_id.as_deref().map(str::trim)
                && !id.is_empty()
            {
                index.by_external_id.insert(id.to_string(), team.id);
            }
            let name = normalize_key(&team.name);
            if !name.is_empty() {
                index.by_name.insert(name, team.id);
            }
        }
        // Mascots only fill gaps; they never shadow a school name.
        for team in teams {
            let Some(short) = team.short_name.as_deref().map(normalize_key) else {
                continue;
            };
            if !short.is_empty() {
                index.by_name.entry(short).or_insert(team.id);
            }
        }
        index
    }
}

/// External id first, then normalized name. No match is `None`, not an error.
pub fn resolve_team(index: &TeamIndex, name: Option<&str>, external_id: Option<&str>) -> Option<TeamId> {
    if let Some(id) = external_id.map(str::trim).filter(|s| !s.is_empty())
        && let Some(team_id) = index.by_external_id.get(id)
    {
        return Some(*team_id);
    }
    let key = normalize_key(name?);
    if key.is_empty() {
        return None;
    }
    index.by_name.get(&key).copied()
}

/// External player id first, then case-insensitive exact name.
pub fn resolve_player_stats<'a>(
    stats: &'a [StatRecord],
    transfer: &TransferRecord,
    normalized_name: &str,
) -> Option<&'a StatRecord> {
    if let Some(id) = transfer
        .external_player_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        && let Some(found) = stats.iter().find(|s| s.player_id.as_deref() == Some(id))
    {
        return Some(found);
    }
    if normalized_name.is_empty() {
        return None;
    }
    stats.iter().find(|s| {
        s.player
            .as_deref()
            .is_some_and(|p| normalize_key(p) == normalized_name)
    })
}

// Candidate spellings per logical stat, in priority order. The `<category><TYPE>`
// spellings come from pivoted long-form CFBD rows.
const GAMES_KEYS: &[&str] = &["games_played", "gamesPlayed", "games", "GP"];
const SNAPS_KEYS: &[&str] = &["snaps", "totalSnaps", "offensiveSnaps", "defensiveSnaps"];
const TARGETS_KEYS: &[&str] = &["targets", "receivingTargets"];
const RECEPTIONS_KEYS: &[&str] = &["receptions", "rec", "receivingREC"];
const YARDS_KEYS: &[&str] = &[
    "yards",
    "receivingYards",
    "rushingYards",
    "passingYards",
    "totalYards",
    "receivingYDS",
    "rushingYDS",
    "passingYDS",
];
const TOUCHDOWN_KEYS: &[&str] = &[
    "touchdowns",
    "tds",
    "receivingTouchdowns",
    "rushingTouchdowns",
    "passingTouchdowns",
    "receivingTD",
    "rushingTD",
    "passingTD",
];
const TACKLES_KEYS: &[&str] = &["tackles", "totalTackles", "defensiveTOT"];
const PASS_BREAKUP_KEYS: &[&str] = &["pass_breakups", "passBreakups", "passesDefended", "defensivePD"];
const INTERCEPTION_KEYS: &[&str] = &["interceptions", "ints", "interceptionsINT"];

/// Collapses a matched stat record into the normalized bundle; no match
/// yields all zeros.
pub fn normalize_stats(record: Option<&StatRecord>) -> StatBundle {
    let Some(record) = record else {
        return StatBundle::default();
    };
    let f = &record.fields;
    StatBundle {
        games_played: coalesce_count(f, GAMES_KEYS),
        snaps: coalesce_count(f, SNAPS_KEYS),
        targets: coalesce_count(f, TARGETS_KEYS),
        receptions: coalesce_count(f, RECEPTIONS_KEYS),
        yards: coalesce_count(f, YARDS_KEYS),
        touchdowns: coalesce_count(f, TOUCHDOWN_KEYS),
        tackles: coalesce_count(f, TACKLES_KEYS),
        pass_breakups: coalesce_count(f, PASS_BREAKUP_KEYS),
        interceptions: coalesce_count(f, INTERCEPTION_KEYS),
    }
}

/// First candidate present with a non-null value wins, even if it coerces to 0.
pub fn coalesce_count(fields: &Map<String, Value>, candidates: &[&str]) -> i64 {
    candidates
        .iter()
        .find_map(|key| fields.get(*key).filter(|v| !v.is_null()))
        .map(coerce_count)
        .unwrap_or(0)
}

/// Integer parse, then float-then-truncate, else 0. Never negative.
pub fn coerce_count(value: &Value) -> i64 {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate_f64))
            .unwrap_or(0),
        Value::String(s) => parse_count(s),
        _ => 0,
    };
    n.max(0)
}

fn parse_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(truncate_f64)
        .unwrap_or(0)
}

fn truncate_f64(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    Some(v.trunc() as i64)
}
