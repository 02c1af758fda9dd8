//! College Football Data API adapter (teams, portal, player season stats).

use std::collections::HashMap;

use reqwest::blocking::Client;
use serde_json::{Map, Value};
use tracing::info;

use super::{PortalSource, pick_string, unwrap_list};
use crate::error::SourceError;
use crate::http_fetch::{fetch_text, parse_json_body};
use crate::records::{StatRecord, TeamRecord, TransferRecord, id_string};

pub struct CfbdSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CfbdSource {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<(String, String), SourceError> {
        let url = format!("{}{path}", self.base_url);
        let auth = format!("Bearer {}", self.api_key.trim());
        let body = fetch_text(&self.client, &url, query, &[("Authorization", auth.as_str())])?;
        Ok((url, body))
    }
}

impl PortalSource for CfbdSource {
    fn name(&self) -> &'static str {
        "cfbd"
    }

    fn fetch_teams(&self) -> Result<Vec<TeamRecord>, SourceError> {
        let (url, body) = self.get("/teams/fbs", &[])?;
        let teams = parse_teams_json(&url, &body)?;
        info!(source = "cfbd", teams = teams.len(), "fetched teams");
        Ok(teams)
    }

    fn fetch_transfers(&self, year: i32) -> Result<Vec<TransferRecord>, SourceError> {
        let query = [
            ("classification", "transfer".to_string()),
            ("year", year.to_string()),
        ];
        let (url, body) = self.get("/portal/players", &query)?;
        let transfers = parse_transfers_json(&url, &body)?;
        info!(source = "cfbd", year, transfers = transfers.len(), "fetched transfers");
        Ok(transfers)
    }

    fn fetch_season_stats(&self, year: i32, team: &str) -> Result<Vec<StatRecord>, SourceError> {
        let query = [("year", year.to_string()), ("team", team.to_string())];
        let (url, body) = self.get("/stats/player/season", &query)?;
        parse_season_stats_json(&url, &body)
    }
}

pub fn parse_teams_json(url: &str, body: &str) -> Result<Vec<TeamRecord>, SourceError> {
    let value = parse_json_body(url, body)?;
    let Value::Array(items) = value else {
        return Err(SourceError::malformed(url, "expected a list of teams", body));
    };
    Ok(items.iter().filter_map(parse_team).collect())
}

fn parse_team(v: &Value) -> Option<TeamRecord> {
    let name = pick_string(v, &["school", "name"])?;
    let logo_url = v
        .get("logos")
        .and_then(Value::as_array)
        .and_then(|logos| logos.iter().find_map(Value::as_str))
        .map(str::to_string)
        .or_else(|| pick_string(v, &["logo"]));
    Some(TeamRecord {
        name,
        short_name: pick_string(v, &["mascot", "abbreviation"]),
        conference: pick_string(v, &["conference"]),
        external_id: v.get("id").and_then(id_string),
        logo_url,
    })
}

pub fn parse_transfers_json(url: &str, body: &str) -> Result<Vec<TransferRecord>, SourceError> {
    let value = parse_json_body(url, body)?;
    let items = unwrap_list(url, value, "players")?;
    Ok(items.iter().filter_map(parse_transfer).collect())
}

fn parse_transfer(v: &Value) -> Option<TransferRecord> {
    let full_name = pick_string(v, &["name", "fullName"]).or_else(|| {
        let first = pick_string(v, &["firstName"]).unwrap_or_default();
        let last = pick_string(v, &["lastName"]).unwrap_or_default();
        let joined = format!("{first} {last}").trim().to_string();
        Some(joined).filter(|s| !s.is_empty())
    })?;
    let destination_team = pick_string(v, &["destination"]);
    let status = if destination_team.is_some() {
        "Committed"
    } else {
        "Entered"
    };
    let entered_date = pick_string(v, &["transferDate"])
        .map(|d| d.split('T').next().unwrap_or_default().to_string());
    Some(TransferRecord {
        full_name,
        position: pick_string(v, &["position"]),
        class_year: pick_string(v, &["classYear", "class"]),
        height: pick_string(v, &["height"]),
        weight: v.get("weight").and_then(Value::as_u64).and_then(|w| u32::try_from(w).ok()),
        hometown: pick_string(v, &["hometown"]),
        rating: v.get("rating").and_then(Value::as_f64),
        status: Some(status.to_string()),
        entered_date,
        origin_team: pick_string(v, &["origin"]),
        destination_team,
        team_external_id: None,
        external_player_id: ["playerId", "athleteId", "id"]
            .iter()
            .find_map(|key| v.get(*key).and_then(id_string)),
        raw_lines: Vec::new(),
    })
}

pub fn parse_season_stats_json(url: &str, body: &str) -> Result<Vec<StatRecord>, SourceError> {
    let value = parse_json_body(url, body)?;
    let items = unwrap_list(url, value, "stats")?;
    Ok(pivot_stat_rows(items))
}

/// Long-form rows (`category`/`statType`/`stat`) fold into one record per
/// player with `<category><statType>` fields; wide rows pass through.
fn pivot_stat_rows(items: Vec<Value>) -> Vec<StatRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Map<String, Value>> = HashMap::new();
    let mut wide = Vec::new();

    for item in items {
        let Value::Object(row) = item else {
            continue;
        };
        let long_form = row.get("statType").is_some_and(Value::is_string)
            && row.get("stat").is_some_and(|v| !v.is_null());
        if !long_form {
            wide.push(StatRecord::from_object(row));
            continue;
        }
        let player_key = row
            .get("playerId")
            .and_then(id_string)
            .or_else(|| row.get("player").and_then(Value::as_str).map(|s| s.trim().to_string()))
            .unwrap_or_default();
        if player_key.is_empty() {
            continue;
        }
        let category = row.get("category").and_then(Value::as_str).unwrap_or_default();
        let stat_type = row.get("statType").and_then(Value::as_str).unwrap_or_default();
        let field = format!("{category}{stat_type}");
        let stat = row.get("stat").cloned().unwrap_or(Value::Null);

        let entry = grouped.entry(player_key.clone()).or_insert_with(|| {
            order.push(player_key);
            let mut base = Map::new();
            for key in ["playerId", "player", "team", "conference", "season"] {
                if let Some(v) = row.get(key) {
                    base.insert(key.to_string(), v.clone());
                }
            }
            base
        });
        entry.insert(field, stat);
    }

    let mut out = wide;
    for key in order {
        if let Some(fields) = grouped.remove(&key) {
            out.push(StatRecord::from_object(fields));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://api.example.test/stats/player/season";

    #[test]
    fn long_form_rows_pivot_per_player() {
        let body = r#"[
            {"playerId":"11","player":"Kai Moss","team":"Utah","category":"receiving","statType":"YDS","stat":"812"},
            {"playerId":"11","player":"Kai Moss","team":"Utah","category":"receiving","statType":"TD","stat":"6"},
            {"playerId":"12","player":"Ben Ash","team":"Utah","category":"interceptions","statType":"INT","stat":"3"}
        ]"#;
        let rows = parse_season_stats_json(URL, body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player_id.as_deref(), Some("11"));
        assert_eq!(rows[0].fields.get("receivingYDS").and_then(Value::as_str), Some("812"));
        assert_eq!(rows[0].fields.get("receivingTD").and_then(Value::as_str), Some("6"));
        assert_eq!(rows[1].fields.get("interceptionsINT").and_then(Value::as_str), Some("3"));
    }

    #[test]
    fn stats_object_wrapper_is_accepted() {
        let body = r#"{"stats":[{"player":"Kai Moss","receivingYards":450}]}"#;
        let rows = parse_season_stats_json(URL, body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player.as_deref(), Some("Kai Moss"));
    }

    #[test]
    fn teams_must_be_a_list() {
        let err = parse_teams_json(URL, r#"{"teams":[]}"#).unwrap_err();
        assert!(err.is_malformed());
    }
}
