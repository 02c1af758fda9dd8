//! The ingest run: fetch feeds, reconcile, score, and upsert.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::records::{StatRecord, TransferRecord, normalize_key};
use crate::reconcile::{TeamIndex, normalize_stats, resolve_player_stats, resolve_team};
use crate::sources::PortalSource;
use crate::store::{PlayerId, PlayerUpsert, PortalStore, SeasonStatRow, TviScoreRow};
use crate::tvi::{MODEL_VERSION, PlayerMeta, compute_tvi};

/// Adapters wired into one run. Stats are optional; without them every
/// player gets a zeroed stat line.
pub struct SourceSet<'a> {
    pub teams: &'a dyn PortalSource,
    pub transfers: &'a dyn PortalSource,
    pub stats: Option<&'a dyn PortalSource>,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub year: i32,
    pub limit: Option<usize>,
}

impl IngestOptions {
    pub fn for_year(year: i32) -> Self {
        Self { year, limit: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub year: i32,
    pub model_version: String,
    pub started_at: String,
    pub finished_at: String,
    pub teams_upserted: usize,
    pub transfers_total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub teams_matched: usize,
    pub stats_matched: usize,
    pub stat_fetch_failures: usize,
    pub errors: Vec<String>,
}

/// Runs one ingest. Team and transfer feed failures abort the run; per-player
/// identity failures and per-team stat fetch failures are counted and skipped.
pub fn ingest_transfers<S: PortalStore>(
    store: &mut S,
    sources: &SourceSet<'_>,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    let year = opts.year;
    let mut summary = IngestSummary {
        year,
        model_version: MODEL_VERSION.to_string(),
        started_at: Utc::now().to_rfc3339(),
        ..Default::default()
    };

    let mut transfers = sources
        .transfers
        .fetch_transfers(year)
        .with_context(|| format!("fetch transfers from {}", sources.transfers.name()))?;
    if let Some(limit) = opts.limit {
        transfers.truncate(limit);
    }
    summary.transfers_total = transfers.len();

    let teams = sources
        .teams
        .fetch_teams()
        .with_context(|| format!("fetch teams from {}", sources.teams.name()))?;
    let stored_teams = store.upsert_teams(&teams)?;
    summary.teams_upserted = stored_teams.len();
    let team_index = TeamIndex::build(&stored_teams);
    let season_id = store.ensure_season(year)?;
    info!(
        year,
        season_id,
        teams = stored_teams.len(),
        transfers = transfers.len(),
        "ingest started"
    );

    let mut stat_cache = StatCache::default();

    for transfer in &transfers {
        let full_name = transfer.full_name.trim().to_string();
        let current_team_id = resolve_team(
            &team_index,
            transfer.current_team(),
            transfer.team_external_id.as_deref(),
        );

        let player = PlayerUpsert {
            full_name: full_name.clone(),
            position: transfer.position.clone(),
            height: transfer.height.clone(),
            weight: transfer.weight,
            class_year: transfer.class_year.clone(),
            hometown: transfer.hometown.clone(),
            previous_team: transfer.origin_team.clone(),
            external_player_id: transfer.external_player_id.clone(),
            current_team_id,
        };
        let player_id = match resolve_player_id(store, &player) {
            Ok(id) => id,
            Err(err) if err.downcast_ref::<IngestError>().is_some() => {
                warn!(player = %full_name, error = %err, "skipping player");
                summary.skipped += 1;
                summary.errors.push(err.to_string());
                continue;
            }
            Err(err) => return Err(err),
        };
        if current_team_id.is_some() {
            summary.teams_matched += 1;
        }

        let stat_lines: &[StatRecord] = match (sources.stats, transfer.stats_team()) {
            (Some(source), Some(team)) => stat_cache.get(source, year, team, &mut summary),
            _ => &[],
        };
        let matched = resolve_player_stats(stat_lines, transfer, &normalize_key(&full_name));
        if matched.is_some() {
            summary.stats_matched += 1;
        }
        let stats = normalize_stats(matched);
        let raw_source = matched
            .map(StatRecord::raw)
            .unwrap_or_else(|| Value::Object(Map::new()));

        store.upsert_season_stats(&SeasonStatRow {
            player_id,
            team_id: current_team_id,
            season_id,
            stats,
            raw_source,
        })?;

        let score = compute_tvi(&stats, &player_meta(transfer));
        debug!(player = %full_name, tvi = score.tvi, "scored");
        store.upsert_tvi_score(&TviScoreRow {
            player_id,
            team_id: current_team_id,
            season_id,
            score,
        })?;

        summary.processed += 1;
    }

    summary.finished_at = Utc::now().to_rfc3339();
    store.record_run(&summary)?;
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        stats_matched = summary.stats_matched,
        stat_fetch_failures = summary.stat_fetch_failures,
        "ingest finished"
    );
    Ok(summary)
}

/// Upsert, then fall back to a lookup by full name when the store hands no
/// row back.
pub fn resolve_player_id<S: PortalStore>(store: &mut S, player: &PlayerUpsert) -> Result<PlayerId> {
    if player.full_name.is_empty() {
        return Err(IngestError::UnresolvedIdentity {
            full_name: player.full_name.clone(),
        }
        .into());
    }
    if let Some(id) = store.upsert_player(player)? {
        return Ok(id);
    }
    store
        .find_player_id_by_name(&player.full_name)?
        .ok_or_else(|| {
            IngestError::UnresolvedIdentity {
                full_name: player.full_name.clone(),
            }
            .into()
        })
}

pub fn player_meta(transfer: &TransferRecord) -> PlayerMeta {
    PlayerMeta {
        class_year: transfer.class_year.clone(),
        position: transfer.position.clone(),
        rating: transfer.rating,
        portal_status: transfer.status.clone(),
    }
}

/// Season stat lines per team, fetched at most once per run. A failed fetch
/// is remembered as an empty list so the team is not retried.
#[derive(Default)]
struct StatCache {
    by_team: HashMap<String, Vec<StatRecord>>,
}

impl StatCache {
    fn get(
        &mut self,
        source: &dyn PortalSource,
        year: i32,
        team: &str,
        summary: &mut IngestSummary,
    ) -> &[StatRecord] {
        let key = normalize_key(team);
        self.by_team.entry(key).or_insert_with(|| {
            match source.fetch_season_stats(year, team.trim()) {
                Ok(rows) => {
                    debug!(team, rows = rows.len(), "fetched season stats");
                    rows
                }
                Err(err) => {
                    warn!(team, error = %err, "season stats unavailable");
                    summary.stat_fetch_failures += 1;
                    summary.errors.push(format!("stats for {team}: {err}"));
                    Vec::new()
                }
            }
        })
    }
}
