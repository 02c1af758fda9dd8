use std::fs;
use std::path::PathBuf;

use portaliq::reconcile::normalize_stats;
use portaliq::sources::cfbd::{parse_season_stats_json, parse_teams_json, parse_transfers_json};
use portaliq::sources::espn::parse_teams_html;
use portaliq::sources::on3::parse_wire_html;
use portaliq::tvi::experience_score;

const URL: &str = "https://api.example.test";

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_on3_wire_fixture() {
    let rows = parse_wire_html(&read_fixture("on3_wire.html"));
    let names: Vec<&str> = rows.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["Malachi Madison", "Kai Moss", "Jay Cole"]);

    let malachi = &rows[0];
    assert_eq!(malachi.position.as_deref(), Some("DL"));
    assert_eq!(malachi.class_year.as_deref(), Some("RS-JR"));
    assert_eq!(malachi.height.as_deref(), Some("6-3"));
    assert_eq!(malachi.weight, Some(275));
    assert_eq!(malachi.hometown.as_deref(), Some("Central (Mobile, AL)"));
    assert_eq!(malachi.rating, Some(89.15));
    assert_eq!(malachi.status.as_deref(), Some("Entered"));
    assert_eq!(malachi.entered_date.as_deref(), Some("11/16/2025"));
    assert_eq!(malachi.origin_team.as_deref(), Some("Alabama"));
    assert!(malachi.destination_team.is_none());
}

#[test]
fn scraped_redshirt_class_scores_as_unknown() {
    let rows = parse_wire_html(&read_fixture("on3_wire.html"));
    let malachi = &rows[0];
    assert_eq!(malachi.class_year.as_deref(), Some("RS-JR"));
    assert_eq!(experience_score(malachi.class_year.as_deref()), 0.5);

    let kai = rows.iter().find(|r| r.full_name == "Kai Moss").unwrap();
    assert_eq!(experience_score(kai.class_year.as_deref()), 0.6);
}

#[test]
fn on3_committed_card_tracks_both_schools() {
    let rows = parse_wire_html(&read_fixture("on3_wire.html"));
    let kai = rows.iter().find(|r| r.full_name == "Kai Moss").unwrap();
    assert_eq!(kai.status.as_deref(), Some("Committed"));
    assert_eq!(kai.entered_date.as_deref(), Some("12/02/2025"));
    assert_eq!(kai.origin_team.as_deref(), Some("Utah"));
    assert_eq!(kai.destination_team.as_deref(), Some("Oregon"));
    assert_eq!(kai.current_team(), Some("Oregon"));
    assert!(kai.rating.is_none());
}

#[test]
fn on3_sparse_card_degrades_to_none() {
    let rows = parse_wire_html(&read_fixture("on3_wire.html"));
    let jay = rows.iter().find(|r| r.full_name == "Jay Cole").unwrap();
    assert_eq!(jay.position.as_deref(), Some("CB"));
    assert!(jay.class_year.is_none());
    assert!(jay.height.is_none());
    assert!(jay.weight.is_none());
    assert!(jay.hometown.is_none());
    assert!(jay.rating.is_none());
    assert_eq!(jay.status.as_deref(), Some("Expected"));
    assert!(jay.entered_date.is_none());
    assert!(jay.origin_team.is_none());
}

#[test]
fn on3_page_without_cards_is_empty() {
    assert!(parse_wire_html("<html><body><p>Maintenance</p></body></html>").is_empty());
}

#[test]
fn parses_espn_teams_fixture() {
    let teams = parse_teams_html(&read_fixture("espn_teams.html"));
    assert_eq!(teams.len(), 3);

    assert_eq!(teams[0].name, "Alabama");
    assert_eq!(teams[0].short_name.as_deref(), Some("Crimson Tide"));
    assert_eq!(teams[0].conference.as_deref(), Some("SEC"));
    assert_eq!(teams[0].external_id.as_deref(), Some("333"));
    assert_eq!(
        teams[0].logo_url.as_deref(),
        Some("https://a.espncdn.com/i/teamlogos/ncaa/500/333.png")
    );

    assert_eq!(teams[1].name, "Georgia");
    assert_eq!(teams[1].short_name.as_deref(), Some("Georgia"));
    assert!(teams[1].logo_url.is_none());

    assert_eq!(teams[2].name, "Oregon");
    assert_eq!(teams[2].conference.as_deref(), Some("Big Ten"));
    assert!(teams.iter().all(|t| t.name != "Orphan"));
}

#[test]
fn parses_cfbd_teams_fixture() {
    let teams = parse_teams_json(URL, &read_fixture("cfbd_teams.json")).expect("fixture should parse");
    assert_eq!(teams.len(), 3);
    assert_eq!(teams[0].external_id.as_deref(), Some("333"));
    assert_eq!(teams[0].short_name.as_deref(), Some("Crimson Tide"));
    assert!(teams[0].logo_url.is_some());
    assert!(teams[1].logo_url.is_none());
}

#[test]
fn parses_cfbd_transfers_fixture() {
    let rows =
        parse_transfers_json(URL, &read_fixture("cfbd_transfers.json")).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].full_name, "Kai Moss");
    assert_eq!(rows[0].status.as_deref(), Some("Committed"));
    assert_eq!(rows[0].entered_date.as_deref(), Some("2023-12-04"));
    assert_eq!(rows[0].current_team(), Some("Oregon"));
    assert_eq!(rows[1].full_name, "Ben Ash");
    assert_eq!(rows[1].status.as_deref(), Some("Entered"));
    assert!(rows[1].destination_team.is_none());
    assert!(rows[1].rating.is_none());
}

#[test]
fn cfbd_transfers_reject_unknown_shapes() {
    let err = parse_transfers_json(URL, r#"{"data": []}"#).unwrap_err();
    assert!(err.is_malformed());
    let err = parse_transfers_json(URL, "<!DOCTYPE html><html></html>").unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().contains("<!DOCTYPE html>"));
}

#[test]
fn cfbd_long_form_stats_coalesce() {
    let rows = parse_season_stats_json(URL, &read_fixture("cfbd_season_stats.json"))
        .expect("fixture should parse");
    assert_eq!(rows.len(), 2);

    let kai = normalize_stats(Some(&rows[0]));
    assert_eq!(kai.yards, 812);
    assert_eq!(kai.touchdowns, 6);
    assert_eq!(kai.receptions, 50);
    assert_eq!(kai.snaps, 0);

    let ben = normalize_stats(Some(&rows[1]));
    assert_eq!(ben.tackles, 41);
    assert_eq!(ben.interceptions, 3);
    assert_eq!(ben.yards, 0);
}
