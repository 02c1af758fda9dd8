use serde::{Deserialize, Serialize};

/// Tag stored with every score so formula generations can coexist.
pub const MODEL_VERSION: &str = "v1";

const FULL_USAGE_SNAPS: f64 = 800.0;
const SEASON_GAMES: f64 = 12.0;
const TD_YARDS: f64 = 20.0;
const INT_YARDS: f64 = 5.0;
const UNKNOWN_EXPERIENCE: f64 = 0.5;

/// Normalized season stat line; every field is a non-negative count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatBundle {
    pub games_played: i64,
    pub snaps: i64,
    pub targets: i64,
    pub receptions: i64,
    pub yards: i64,
    pub touchdowns: i64,
    pub tackles: i64,
    pub pass_breakups: i64,
    pub interceptions: i64,
}

/// Player attributes the model reads besides the stat line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerMeta {
    pub class_year: Option<String>,
    pub position: Option<String>,
    pub rating: Option<f64>,
    pub portal_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TviComponents {
    pub usage: f64,
    pub efficiency: f64,
    pub durability: f64,
    pub experience: f64,
}

impl TviComponents {
    pub fn as_array(&self) -> [f64; 4] {
        [self.usage, self.efficiency, self.durability, self.experience]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TviScore {
    pub tvi: f64,
    pub components: TviComponents,
    pub model_version: String,
}

pub fn compute_tvi(stats: &StatBundle, meta: &PlayerMeta) -> TviScore {
    let snaps = stats.snaps as f64;
    let yards = stats.yards as f64;
    let touchdowns = stats.touchdowns as f64;
    let interceptions = stats.interceptions as f64;
    let games = stats.games_played as f64;

    let components = TviComponents {
        usage: safe_divide(snaps, FULL_USAGE_SNAPS).min(1.0),
        efficiency: safe_divide(yards + TD_YARDS * touchdowns + INT_YARDS * interceptions, snaps),
        durability: safe_divide(games, SEASON_GAMES),
        experience: experience_score(meta.class_year.as_deref()),
    };
    let parts = components.as_array();
    let tvi = parts.iter().sum::<f64>() / parts.len() as f64;

    TviScore {
        tvi,
        components,
        model_version: MODEL_VERSION.to_string(),
    }
}

/// Maps class-year text to an experience weight. Only the bare class
/// tokens are recognized; "RS-JR" and other decorated forms score as unknown.
pub fn experience_score(class_year: Option<&str>) -> f64 {
    let Some(raw) = class_year else {
        return UNKNOWN_EXPERIENCE;
    };
    match raw.trim().to_lowercase().as_str() {
        "sr" | "senior" => 1.0,
        "jr" | "junior" => 0.8,
        "so" | "soph" | "sophomore" => 0.6,
        "fr" | "freshman" => 0.4,
        _ => UNKNOWN_EXPERIENCE,
    }
}

fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(class_year: &str) -> PlayerMeta {
        PlayerMeta {
            class_year: Some(class_year.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn zero_snaps_never_divides() {
        let stats = StatBundle {
            yards: 900,
            touchdowns: 7,
            interceptions: 3,
            ..Default::default()
        };
        let score = compute_tvi(&stats, &PlayerMeta::default());
        assert_eq!(score.components.efficiency, 0.0);
        assert_eq!(score.components.usage, 0.0);
        assert!(score.tvi.is_finite());
    }

    #[test]
    fn usage_is_clamped() {
        let stats = StatBundle {
            snaps: 1600,
            ..Default::default()
        };
        assert_eq!(compute_tvi(&stats, &PlayerMeta::default()).components.usage, 1.0);
    }

    #[test]
    fn experience_buckets() {
        for raw in ["SR", " sr ", "Senior"] {
            assert_eq!(experience_score(Some(raw)), 1.0, "{raw}");
        }
        assert_eq!(experience_score(Some("Jr")), 0.8);
        assert_eq!(experience_score(Some("soph")), 0.6);
        assert_eq!(experience_score(Some("FR")), 0.4);
        assert_eq!(experience_score(Some("GR")), 0.5);
        assert_eq!(experience_score(Some("")), 0.5);
        assert_eq!(experience_score(None), 0.5);
    }

    #[test]
    fn redshirt_classes_score_as_unknown() {
        assert_eq!(experience_score(Some("RS-JR")), 0.5);
        assert_eq!(experience_score(Some("RS-SO")), 0.5);
        assert_eq!(experience_score(Some("Redshirt Freshman")), 0.5);
        assert_eq!(experience_score(Some(" Junior ")), 0.8);
    }

    #[test]
    fn worked_example() {
        let stats = StatBundle {
            snaps: 400,
            yards: 600,
            touchdowns: 5,
            interceptions: 1,
            games_played: 10,
            ..Default::default()
        };
        let score = compute_tvi(&stats, &meta("JR"));
        let c = score.components;
        assert!((c.usage - 0.5).abs() < 1e-12);
        assert!((c.efficiency - 1.7625).abs() < 1e-12);
        assert!((c.durability - 10.0 / 12.0).abs() < 1e-12);
        assert!((c.experience - 0.8).abs() < 1e-12);
        assert!((score.tvi - 0.974_0).abs() < 1e-4);
        assert_eq!(score.model_version, MODEL_VERSION);
    }
}
