//! ESPN college football teams page scrape.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use super::PortalSource;
use crate::error::SourceError;
use crate::http_fetch::fetch_text;
use crate::records::TeamRecord;

static CONFERENCE_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.ContentList__Item").expect("valid conference selector"));
static H2: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").expect("valid h2 selector"));
static H3: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("valid h3 selector"));
static TEAM_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="/college-football/team/"]"#).expect("valid team link selector")
});
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").expect("valid span selector"));
static NAME_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.AnchorLink").expect("valid name selector"));
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid img selector"));
static ESPN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/id/(\d+)").expect("valid id regex"));

pub struct EspnTeamsSource {
    client: Client,
    url: String,
}

impl EspnTeamsSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl PortalSource for EspnTeamsSource {
    fn name(&self) -> &'static str {
        "espn"
    }

    fn fetch_teams(&self) -> Result<Vec<TeamRecord>, SourceError> {
        let html = fetch_text(&self.client, &self.url, &[], &[])?;
        let teams = parse_teams_html(&html);
        if teams.is_empty() {
            return Err(SourceError::malformed(&self.url, "no team cards found", &html));
        }
        info!(source = "espn", teams = teams.len(), "scraped teams page");
        Ok(teams)
    }
}

pub fn parse_teams_html(html: &str) -> Vec<TeamRecord> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for block in document.select(&CONFERENCE_BLOCK) {
        let Some(conference) = heading_text(block) else {
            continue;
        };
        for link in block.select(&TEAM_LINK) {
            let Some(external_id) = link.value().attr("href").and_then(extract_espn_id) else {
                continue;
            };
            // Logo and name are often separate links to the same team page.
            let Some(team) = parse_team_link(link, &conference, external_id) else {
                continue;
            };
            if seen.insert(team.external_id.clone()) {
                out.push(team);
            }
        }
    }
    out
}

fn heading_text(block: ElementRef<'_>) -> Option<String> {
    block
        .select(&H2)
        .next()
        .or_else(|| block.select(&H3).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn parse_team_link(link: ElementRef<'_>, conference: &str, external_id: String) -> Option<TeamRecord> {
    let name = link
        .select(&NAME_SPAN)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())?;
    let spans: Vec<String> = link.select(&SPAN).map(element_text).collect();
    let short_name = if spans.len() > 1 {
        spans.last().cloned().filter(|s| !s.is_empty())
    } else {
        Some(name.clone())
    };
    let logo_url = link
        .select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);
    Some(TeamRecord {
        name,
        short_name,
        conference: Some(conference.to_string()),
        external_id: Some(external_id),
        logo_url,
    })
}

/// `.../team/_/id/333/alabama-crimson-tide` -> `333`.
pub fn extract_espn_id(url: &str) -> Option<String> {
    ESPN_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
