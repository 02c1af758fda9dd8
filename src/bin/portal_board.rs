use anyhow::{Context, Result, anyhow};

use portaliq::config::{IngestConfig, load_dotenv};
use portaliq::dashboard::{
    BoardFilter, filter_board, list_conferences, list_positions, list_seasons, load_board,
    load_player_stats,
};
use portaliq::logging::init_tracing;
use portaliq::store::SqliteStore;
use portaliq::tvi::MODEL_VERSION;

const DEFAULT_ROWS: usize = 25;

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = IngestConfig::from_env()?;
    if let Some(path) = arg_value(&args, "--db") {
        cfg.db_path = Some(path.into());
    }
    let db_path = cfg
        .resolved_db_path()
        .context("unable to resolve sqlite path")?;
    let store = SqliteStore::open(&db_path)?;
    let conn = store.connection();

    let seasons = list_seasons(conn)?;
    let season = match arg_value(&args, "--year") {
        Some(raw) => {
            let year: i32 = raw
                .parse()
                .map_err(|_| anyhow!("--year expects a year, got {raw:?}"))?;
            seasons
                .iter()
                .find(|s| s.year == year)
                .ok_or_else(|| anyhow!("no season {year} in {}", db_path.display()))?
        }
        None => seasons
            .first()
            .ok_or_else(|| anyhow!("no seasons ingested yet in {}", db_path.display()))?,
    };

    if args.iter().any(|a| a == "--facets") {
        println!("Conferences: {}", list_conferences(conn)?.join(", "));
        println!("Positions: {}", list_positions(conn)?.join(", "));
        return Ok(());
    }

    let filter = BoardFilter {
        conferences: arg_list(&args, "--conference"),
        positions: arg_list(&args, "--position"),
        min_tvi: arg_value(&args, "--min-tvi").and_then(|raw| raw.parse::<f64>().ok()),
    };
    let model_version = arg_value(&args, "--model").unwrap_or_else(|| MODEL_VERSION.to_string());
    let rows = filter_board(load_board(conn, season.id, &model_version)?, &filter);
    let limit = arg_value(&args, "--rows")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_ROWS);

    println!("Season {} | model {} | {} players", season.year, model_version, rows.len());
    println!(
        "{:<4} {:<26} {:<5} {:<22} {:<14} {:>7}",
        "#", "Player", "Pos", "Team", "Conference", "TVI"
    );
    println!("{}", "-".repeat(82));
    for (idx, row) in rows.iter().take(limit).enumerate() {
        println!(
            "{:<4} {:<26} {:<5} {:<22} {:<14} {:>7.3}",
            idx + 1,
            row.player,
            row.position.as_deref().unwrap_or("-"),
            row.team.as_deref().unwrap_or("-"),
            row.conference.as_deref().unwrap_or("-"),
            row.tvi
        );
    }

    if let Some(top) = rows.first() {
        println!();
        println!("Top player: {}", top.player);
        if let Some(c) = top.components {
            println!(
                "  usage {:.3}  efficiency {:.3}  durability {:.3}  experience {:.3}",
                c.usage, c.efficiency, c.durability, c.experience
            );
        }
        match load_player_stats(conn, top.player_id, season.id)? {
            Some(line) => {
                let s = line.stats;
                println!(
                    "  games {}  snaps {}  yards {}  td {}  tackles {}  int {}",
                    s.games_played, s.snaps, s.yards, s.touchdowns, s.tackles, s.interceptions
                );
            }
            None => println!("  no stats for this player and season"),
        }
    }
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

/// Comma-separated values, e.g. `--conference SEC,Big Ten`.
fn arg_list(args: &[String], flag: &str) -> Vec<String> {
    arg_value(args, flag)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
