use anyhow::{Context, Result, anyhow};

use portaliq::config::{IngestConfig, SourceKind, load_dotenv};
use portaliq::http_client::http_client;
use portaliq::ingest::{IngestOptions, SourceSet, ingest_transfers};
use portaliq::logging::init_tracing;
use portaliq::sources::{CfbdSource, EspnTeamsSource, On3WireSource, PortalSource};
use portaliq::store::SqliteStore;

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let mut cfg = IngestConfig::from_env()?;
    apply_args(&mut cfg, &std::env::args().skip(1).collect::<Vec<_>>())?;

    let db_path = cfg
        .resolved_db_path()
        .context("unable to resolve sqlite path")?;
    let mut store = SqliteStore::open(&db_path)?;
    let client = http_client(cfg.timeout)?;

    let cfbd = cfg
        .cfbd_api_key
        .as_deref()
        .map(|key| CfbdSource::new(client.clone(), cfg.cfbd_base_url.clone(), key));
    let espn = EspnTeamsSource::new(client.clone(), cfg.espn_teams_url.clone());
    let on3 = On3WireSource::new(client, cfg.on3_wire_url.clone());

    let sources = match (cfg.source, cfbd.as_ref()) {
        (SourceKind::Cfbd, Some(api)) => SourceSet {
            teams: api,
            transfers: api,
            stats: Some(api as &dyn PortalSource),
        },
        (SourceKind::Cfbd, None) => {
            return Err(anyhow!("CFBD_API_KEY must be set for --source cfbd"));
        }
        (SourceKind::Scrape, api) => SourceSet {
            teams: &espn,
            transfers: &on3,
            stats: api.map(|a| a as &dyn PortalSource),
        },
    };

    let opts = IngestOptions {
        year: cfg.year,
        limit: cfg.limit,
    };
    let summary = ingest_transfers(&mut store, &sources, &opts)?;

    println!("Transfer ingest complete");
    println!("DB: {}", db_path.display());
    println!("Season: {} (model {})", summary.year, summary.model_version);
    println!("Teams upserted: {}", summary.teams_upserted);
    println!(
        "Players: {}/{} processed, {} skipped",
        summary.processed, summary.transfers_total, summary.skipped
    );
    println!(
        "Teams matched: {}  Stats matched: {}  Stat fetch failures: {}",
        summary.teams_matched, summary.stats_matched, summary.stat_fetch_failures
    );
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!("   - {err}");
        }
    }
    Ok(())
}

fn apply_args(cfg: &mut IngestConfig, args: &[String]) -> Result<()> {
    if let Some(path) = arg_value(args, "--db") {
        cfg.db_path = Some(path.into());
    }
    if let Some(raw) = arg_value(args, "--year") {
        cfg.year = raw
            .parse()
            .map_err(|_| anyhow!("--year expects a year, got {raw:?}"))?;
    }
    if let Some(raw) = arg_value(args, "--source") {
        cfg.source = raw.parse()?;
    }
    if let Some(raw) = arg_value(args, "--limit") {
        cfg.limit = raw.parse::<usize>().ok().filter(|n| *n > 0);
    }
    Ok(())
}

/// Accepts both `--flag=value` and `--flag value`.
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
