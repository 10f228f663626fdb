use tracing::info;

use crate::error::{PipelineError, Result};
use crate::fixtures::reconcile_fixtures;
use crate::fpl_live::reconcile_live;
use crate::mapping::{MappingReport, refresh_player_mapping, unmapped_stat_players};
use crate::odm::{OdmConfig, compute_gameweek_ratings, has_ratings_for};
use crate::player_matches::{
    fetch_match_details, pending_player_fixtures, reconcile_player_matches,
};
use crate::schedule::build_schedule;
use crate::season::SeasonState;
use crate::sources::{MatchSource, PlayerInfoSource};
use crate::store::TableStore;

#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub matches: &'a dyn MatchSource,
    pub players: &'a dyn PlayerInfoSource,
}

#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub season: String,
    pub completed_gameweek: u32,
    pub fixtures_added: usize,
    pub ratings_added: usize,
    pub player_rows_added: usize,
    pub mapped_players: usize,
    pub report: MappingReport,
    pub tables_written: Vec<&'static str>,
}

/// Nothing is committed unless every fetch and computation succeeded.
pub fn advance_to_gameweek<S: TableStore>(
    store: &mut S,
    sources: Sources<'_>,
    season: &str,
    completed_gw: u32,
    odm: &OdmConfig,
) -> Result<CycleSummary> {
    let mut state = SeasonState::load(store)?;
    state.teams.require_complete()?;

    info!(season, gameweek = completed_gw, "fetching league matches");
    let matches = sources
        .matches
        .league_matches(season)
        .map_err(|err| PipelineError::fetch("league matches", err))?;
    let new_fixtures = reconcile_fixtures(&matches, &state.fixtures, &state.teams, completed_gw)?;
    let fixtures_added = state.append_fixtures(new_fixtures);
    info!(fixtures_added, "fixtures reconciled");

    let target_gw = completed_gw + 1;
    let ratings = compute_gameweek_ratings(&state.fixtures, &state.teams, target_gw, odm)?;
    let fresh = ratings
        .into_iter()
        .filter(|r| !has_ratings_for(&state.ratings, r.gameweek, r.window))
        .collect::<Vec<_>>();
    let ratings_added = state.append_ratings(fresh);
    info!(target_gw, ratings_added, "ratings computed");

    let pending = pending_player_fixtures(&state.fixtures, &state.player_matches);
    let details = fetch_match_details(sources.matches, &pending)?;
    let player_rows = reconcile_player_matches(
        &details,
        &state.fixtures,
        &state.player_matches,
        &state.teams,
    )?;
    let player_rows_added = state.append_player_matches(player_rows);
    info!(
        fixtures = pending.len(),
        player_rows_added, "player match rows reconciled"
    );

    let snapshot = sources
        .players
        .player_snapshot()
        .map_err(|err| PipelineError::fetch("player snapshot", err))?;
    let refresh = refresh_player_mapping(&state.player_mapping, &snapshot, &state.teams);
    state.replace_player_mapping(refresh.rows);

    let mut report = refresh.report;
    report.extend(unmapped_stat_players(
        &state.player_matches,
        &state.player_mapping,
    ));
    report.log_warnings();

    let tables_written = state.commit(store)?;
    Ok(CycleSummary {
        season: season.to_string(),
        completed_gameweek: completed_gw,
        fixtures_added,
        ratings_added,
        player_rows_added,
        mapped_players: state
            .player_mapping
            .iter()
            .filter(|m| m.player_id.is_some())
            .count(),
        report,
        tables_written,
    })
}

pub fn build_season_schedule<S: TableStore>(
    store: &mut S,
    source: &dyn MatchSource,
    season: &str,
) -> Result<usize> {
    let mut state = SeasonState::load(store)?;
    state.teams.require_complete()?;
    let matches = source
        .league_matches(season)
        .map_err(|err| PipelineError::fetch("season schedule", err))?;
    let schedule = build_schedule(&matches, &state.teams)?;
    let count = schedule.len();
    state.replace_schedule(schedule);
    state.commit(store)?;
    Ok(count)
}

pub fn refresh_mapping<S: TableStore>(
    store: &mut S,
    source: &dyn PlayerInfoSource,
) -> Result<MappingReport> {
    let mut state = SeasonState::load(store)?;
    let snapshot = source
        .player_snapshot()
        .map_err(|err| PipelineError::fetch("player snapshot", err))?;
    let refresh = refresh_player_mapping(&state.player_mapping, &snapshot, &state.teams);
    state.replace_player_mapping(refresh.rows);
    refresh.report.log_warnings();
    state.commit(store)?;
    Ok(refresh.report)
}

pub fn record_live_gameweek<S: TableStore>(
    store: &mut S,
    source: &dyn PlayerInfoSource,
    gameweek: u32,
) -> Result<usize> {
    let mut state = SeasonState::load(store)?;
    let raw = source
        .live_gameweek(gameweek)
        .map_err(|err| PipelineError::fetch("live gameweek", err))?;
    let rows = reconcile_live(&raw, &state.fpl_live, gameweek);
    let added = state.append_fpl_live(rows);
    state.commit(store)?;
    info!(gameweek, added, "live gameweek recorded");
    Ok(added)
}
