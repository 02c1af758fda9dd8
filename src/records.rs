//! Intermediate record shapes produced by source adapters.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecord {
    pub name: String,
    pub short_name: Option<String>,
    pub conference: Option<String>,
    pub external_id: Option<String>,
    pub logo_url: Option<String>,
}

impl TeamRecord {
    /// Natural key: external id when present, else the normalized name.
    pub fn identity_key(&self) -> String {
        match self.external_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("id:{id}"),
            _ => format!("name:{}", normalize_key(&self.name)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferRecord {
    pub full_name: String,
    pub position: Option<String>,
    pub class_year: Option<String>,
    pub height: Option<String>,
    pub weight: Option<u32>,
    pub hometown: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub entered_date: Option<String>,
    pub origin_team: Option<String>,
    pub destination_team: Option<String>,
    pub team_external_id: Option<String>,
    pub external_player_id: Option<String>,
    /// Visible card text, kept for scraped records only.
    pub raw_lines: Vec<String>,
}

impl TransferRecord {
    /// Team the player is affiliated with now: destination once committed,
    /// otherwise the school they are leaving.
    pub fn current_team(&self) -> Option<&str> {
        self.destination_team
            .as_deref()
            .or(self.origin_team.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Team whose season stats describe this player.
    pub fn stats_team(&self) -> Option<&str> {
        self.origin_team
            .as_deref()
            .or(self.destination_team.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// One player's season line from a stat feed, with its fields left in the
/// source's own spelling until reconciliation coalesces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatRecord {
    pub player_id: Option<String>,
    pub player: Option<String>,
    pub team: Option<String>,
    pub fields: Map<String, Value>,
}

impl StatRecord {
    pub fn from_object(fields: Map<String, Value>) -> Self {
        let player_id = ["playerId", "player_id", "athleteId", "id"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(id_string));
        let player = ["player", "playerName", "name", "fullName"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let team = fields
            .get("team")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            player_id,
            player,
            team,
            fields,
        }
    }

    pub fn raw(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Trimmed, lowercased key used for name matching.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Reads a JSON id that may be a number or a string.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
