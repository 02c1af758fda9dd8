use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::Datelike;

const APP_DIR: &str = "portaliq";
const DB_FILE: &str = "portal.sqlite";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const CFBD_BASE_URL: &str = "https://api.collegefootballdata.com/api";
pub const ON3_WIRE_URL: &str = "https://www.on3.com/transfer-portal/wire/football/";
pub const ESPN_TEAMS_URL: &str = "https://www.espn.com/college-football/teams";

/// Which adapters feed a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// ESPN team page + On3 wire; CFBD stats when an API key is configured.
    Scrape,
    /// Everything from the College Football Data API.
    Cfbd,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scrape" | "on3" | "web" => Ok(Self::Scrape),
            "cfbd" | "api" => Ok(Self::Cfbd),
            other => Err(anyhow!("unknown source kind {other:?} (expected scrape or cfbd)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub db_path: Option<PathBuf>,
    pub year: i32,
    pub source: SourceKind,
    pub limit: Option<usize>,
    pub timeout: Duration,
    pub cfbd_api_key: Option<String>,
    pub cfbd_base_url: String,
    pub on3_wire_url: String,
    pub espn_teams_url: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            year: chrono::Utc::now().year(),
            source: SourceKind::Scrape,
            limit: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cfbd_api_key: None,
            cfbd_base_url: CFBD_BASE_URL.to_string(),
            on3_wire_url: ON3_WIRE_URL.to_string(),
            espn_teams_url: ESPN_TEAMS_URL.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = env_non_empty("PORTAL_DB_PATH") {
            cfg.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = env_non_empty("PORTAL_YEAR") {
            cfg.year = raw
                .parse()
                .map_err(|_| anyhow!("PORTAL_YEAR is not a year: {raw:?}"))?;
        }
        if let Some(raw) = env_non_empty("PORTAL_SOURCE") {
            cfg.source = raw.parse()?;
        }
        cfg.limit = env_non_empty("PORTAL_LIMIT")
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|n| *n > 0);
        if let Some(secs) = env_non_empty("PORTAL_HTTP_TIMEOUT_SECS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|n| *n > 0)
        {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg.cfbd_api_key = env_non_empty("CFBD_API_KEY");
        if let Some(url) = env_non_empty("CFBD_BASE_URL") {
            cfg.cfbd_base_url = url;
        }
        if let Some(url) = env_non_empty("ON3_WIRE_URL") {
            cfg.on3_wire_url = url;
        }
        if let Some(url) = env_non_empty("ESPN_TEAMS_URL") {
            cfg.espn_teams_url = url;
        }
        Ok(cfg)
    }

    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(default_db_path)
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

/// Loads `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_aliases() {
        assert_eq!("cfbd".parse::<SourceKind>().unwrap(), SourceKind::Cfbd);
        assert_eq!(" API ".parse::<SourceKind>().unwrap(), SourceKind::Cfbd);
        assert_eq!("scrape".parse::<SourceKind>().unwrap(), SourceKind::Scrape);
        assert!("ftp".parse::<SourceKind>().is_err());
    }

    #[test]
    fn defaults_use_thirty_second_timeout() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.source, SourceKind::Scrape);
    }
}
