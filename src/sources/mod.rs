//! Source adapters. Each one implements [`PortalSource`] for the feeds it
//! actually has; the others report [`SourceError::Unsupported`].

pub mod cfbd;
pub mod espn;
pub mod on3;

use serde_json::Value;

use crate::error::SourceError;
use crate::records::{StatRecord, TeamRecord, TransferRecord};

pub use cfbd::CfbdSource;
pub use espn::EspnTeamsSource;
pub use on3::On3WireSource;

pub trait PortalSource {
    fn name(&self) -> &'static str;

    fn fetch_teams(&self) -> Result<Vec<TeamRecord>, SourceError> {
        Err(SourceError::Unsupported {
            source_name: self.name(),
            feed: "team",
        })
    }

    fn fetch_transfers(&self, _year: i32) -> Result<Vec<TransferRecord>, SourceError> {
        Err(SourceError::Unsupported {
            source_name: self.name(),
            feed: "transfer",
        })
    }

    fn fetch_season_stats(&self, _year: i32, _team: &str) -> Result<Vec<StatRecord>, SourceError> {
        Err(SourceError::Unsupported {
            source_name: self.name(),
            feed: "season stat",
        })
    }
}

/// Accepts a bare list, or an object carrying the list under `key`.
pub(crate) fn unwrap_list(url: &str, value: Value, key: &str) -> Result<Vec<Value>, SourceError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SourceError::malformed(
                url,
                format!("expected a list or an object with a {key:?} list"),
                &Value::Object(map).to_string(),
            )),
        },
        other => Err(SourceError::malformed(
            url,
            "expected a list at the top level",
            &other.to_string(),
        )),
    }
}

/// First non-empty string (or number) among `keys`.
pub(crate) fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
