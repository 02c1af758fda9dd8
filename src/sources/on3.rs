//! On3 transfer portal wire scrape.
//!
//! Cards are found by their `/rivals/` profile link; the link's parent holds
//! the card text. Expected line layout, every field optional past the name:
//!
//! ```text
//! DL                          position
//! Malachi Madison             name
//! RS-JR / 6-3 / 275           class / height / weight
//! Central (Mobile, AL)        high school
//! 89.15                       rating
//! Entered 11/16/2025          status (+ date), or Committed / Expected
//! ```

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::PortalSource;
use crate::error::SourceError;
use crate::http_fetch::fetch_text;
use crate::records::TransferRecord;

static PLAYER_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/rivals/"]"#).expect("valid player link selector"));
static COLLEGE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/college/"]"#).expect("valid college link selector"));
static RATING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,3}\.\d{2}$").expect("valid rating regex"));

const ENTERED_PREFIX: &str = "Entered ";

pub struct On3WireSource {
    client: Client,
    url: String,
}

impl On3WireSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl PortalSource for On3WireSource {
    fn name(&self) -> &'static str {
        "on3"
    }

    /// The wire page only lists the current cycle; `year` is not a filter.
    fn fetch_transfers(&self, _year: i32) -> Result<Vec<TransferRecord>, SourceError> {
        let html = fetch_text(&self.client, &self.url, &[], &[])?;
        let transfers = parse_wire_html(&html);
        if transfers.is_empty() {
            return Err(SourceError::malformed(
                &self.url,
                "no player cards found on wire page",
                &html,
            ));
        }
        info!(source = "on3", transfers = transfers.len(), "scraped wire page");
        Ok(transfers)
    }
}

/// Parses every player card on the page, dropping repeats by
/// (name, status, entered date).
pub fn parse_wire_html(html: &str) -> Vec<TransferRecord> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<(String, Option<String>, Option<String>)> = HashSet::new();
    let mut out = Vec::new();

    for link in document.select(&PLAYER_LINK) {
        let Some(card) = link.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let Some(player) = parse_card(card) else {
            continue;
        };
        let key = (
            player.full_name.clone(),
            player.status.clone(),
            player.entered_date.clone(),
        );
        if !seen.insert(key) {
            debug!(player = %player.full_name, "duplicate wire card");
            continue;
        }
        out.push(player);
    }
    out
}

fn parse_card(card: ElementRef<'_>) -> Option<TransferRecord> {
    let lines = card_lines(card);
    let mut teams = card
        .select(&COLLEGE_LINK)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());
    let origin = teams.next();
    let destination = teams.find(|t| Some(t) != origin.as_ref());
    parse_card_lines(lines, origin, destination)
}

fn card_lines(card: ElementRef<'_>) -> Vec<String> {
    card.text()
        .flat_map(|t| t.split('\n'))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_card_lines(
    lines: Vec<String>,
    origin_team: Option<String>,
    destination_team: Option<String>,
) -> Option<TransferRecord> {
    if lines.len() < 2 {
        return None;
    }
    let position = Some(lines[0].clone());
    let full_name = lines[1].clone();
    let rest = &lines[2..];

    let (class_year, height, weight) = rest
        .iter()
        .find(|l| l.contains('/') && l.chars().any(|c| c.is_ascii_digit()) && !l.starts_with(ENTERED_PREFIX))
        .map(|l| split_class_line(l))
        .unwrap_or_default();
    let hometown = rest
        .iter()
        .find(|l| l.contains('(') && l.contains(')'))
        .cloned();
    let rating = extract_rating(&lines);
    let (status, entered_date) = extract_status_and_date(&lines);

    Some(TransferRecord {
        full_name,
        position,
        class_year,
        height,
        weight,
        hometown,
        rating,
        status,
        entered_date,
        origin_team,
        destination_team,
        team_external_id: None,
        external_player_id: None,
        raw_lines: lines,
    })
}

/// `RS-JR / 6-3 / 275` -> (class, height, weight).
fn split_class_line(line: &str) -> (Option<String>, Option<String>, Option<u32>) {
    let mut parts = line.split('/').map(str::trim);
    let non_empty = |p: Option<&str>| p.filter(|s| !s.is_empty()).map(str::to_string);
    let class_year = non_empty(parts.next());
    let height = non_empty(parts.next());
    let weight = parts.next().and_then(|w| {
        let digits: String = w.chars().filter(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });
    (class_year, height, weight)
}

pub fn extract_rating(lines: &[String]) -> Option<f64> {
    lines
        .iter()
        .flat_map(|l| l.split_whitespace())
        .find(|token| RATING.is_match(token))
        .and_then(|token| token.parse::<f64>().ok())
}

/// The latest status marker in the card wins; the date comes from the
/// first `Entered <date>` line.
pub fn extract_status_and_date(lines: &[String]) -> (Option<String>, Option<String>) {
    let mut status = None;
    let mut date = None;
    for line in lines {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(ENTERED_PREFIX) {
            status = Some("Entered".to_string());
            if date.is_none() {
                date = Some(rest.trim().to_string()).filter(|d| !d.is_empty());
            }
        } else if line == "Committed" || line == "Expected" {
            status = Some(line.to_string());
        }
    }
    (status, date)
}
