use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::fixtures::Fixture;
use crate::mapping::{Source, TeamMapping};
use crate::sources::{MatchSource, RawMatchDetail, RawShot, Side};
use crate::store::Record;

/// One player's statistics in one fixture. Derived columns are computed at
/// reconciliation time and stored, never recomputed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchRecord {
    pub player_id: u64,
    pub fixture_id: u64,
    pub gameweek: u32,
    pub team_id: u32,
    pub player: String,
    pub position: String,
    pub h_a: String,
    pub minutes: u32,
    pub goals: u32,
    pub own_goals: u32,
    pub assists: u32,
    pub shots: u32,
    pub key_passes: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    #[serde(rename = "xG")]
    pub xg: f64,
    #[serde(rename = "xA")]
    pub xa: f64,
    #[serde(rename = "xGChain")]
    pub xg_chain: f64,
    #[serde(rename = "xGBuildup")]
    pub xg_buildup: f64,
    #[serde(rename = "team_xG")]
    pub team_xg: f64,
    pub penalty_attempts: u32,
    pub penalty_scored: u32,
    #[serde(rename = "xGI")]
    pub xgi: f64,
    #[serde(rename = "npxG")]
    pub npxg: f64,
    #[serde(rename = "npxGI")]
    pub npxgi: f64,
}

impl Record for PlayerMatchRecord {
    const TABLE: &'static str = "player_data";
    const COLUMNS: &'static [&'static str] = &[
        "player_id",
        "fixture_id",
        "gameweek",
        "team_id",
        "player",
        "position",
        "h_a",
        "minutes",
        "goals",
        "own_goals",
        "assists",
        "shots",
        "key_passes",
        "yellow_cards",
        "red_cards",
        "xG",
        "xA",
        "xGChain",
        "xGBuildup",
        "team_xG",
        "penalty_attempts",
        "penalty_scored",
        "xGI",
        "npxG",
        "npxGI",
    ];
}

pub fn pending_player_fixtures(fixtures: &[Fixture], records: &[PlayerMatchRecord]) -> Vec<u64> {
    let recorded: HashSet<u64> = records.iter().map(|r| r.fixture_id).collect();
    let mut ids = fixtures
        .iter()
        .map(|f| f.fixture_id)
        .filter(|id| !recorded.contains(id))
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// The xG removed per penalty attempt in one fixture: the largest xG of any
/// penalty shot in that fixture, or 0.0 when there were none.
pub fn penalty_unit(shots: &[RawShot]) -> f64 {
    shots
        .iter()
        .filter(|s| s.is_penalty())
        .map(|s| s.xg)
        .fold(0.0, f64::max)
}

pub fn fetch_match_details<S>(source: &S, fixture_ids: &[u64]) -> Result<Vec<RawMatchDetail>>
where
    S: MatchSource + ?Sized,
{
    let mut out = Vec::with_capacity(fixture_ids.len());
    for id in fixture_ids {
        let mut detail = source
            .match_detail(*id)
            .map_err(|err| PipelineError::fetch("player match detail", err))?;
        detail.fixture_id = *id;
        out.push(detail);
    }
    Ok(out)
}

#[derive(Debug, Default, Clone, Copy)]
struct PenaltyTally {
    attempts: u32,
    scored: u32,
}

/// A roster team missing from the mapping fails the batch.
pub fn reconcile_player_matches(
    details: &[RawMatchDetail],
    fixtures: &[Fixture],
    recorded: &[PlayerMatchRecord],
    teams: &TeamMapping,
) -> Result<Vec<PlayerMatchRecord>> {
    let fixtures_by_id: HashMap<u64, &Fixture> =
        fixtures.iter().map(|f| (f.fixture_id, f)).collect();
    let recorded_fixtures: HashSet<u64> = recorded.iter().map(|r| r.fixture_id).collect();

    let mut out = Vec::new();
    let mut keys: HashSet<(u64, u64)> = HashSet::new();

    for detail in details {
        if recorded_fixtures.contains(&detail.fixture_id) {
            continue;
        }
        let Some(fixture) = fixtures_by_id.get(&detail.fixture_id) else {
            debug!(
                fixture_id = detail.fixture_id,
                "skipping player detail for unknown fixture"
            );
            continue;
        };

        let unit = penalty_unit(&detail.shots);
        let mut penalties: HashMap<u64, PenaltyTally> = HashMap::new();
        for shot in detail.shots.iter().filter(|s| s.is_penalty()) {
            let tally = penalties.entry(shot.player_id).or_default();
            tally.attempts += 1;
            if shot.is_goal() {
                tally.scored += 1;
            }
        }

        for entry in &detail.roster {
            if !keys.insert((entry.player_id, detail.fixture_id)) {
                continue;
            }
            let team_id =
                teams.resolve_for_fixture(detail.fixture_id, Source::Understat, entry.team_id)?;
            let tally = penalties.get(&entry.player_id).copied().unwrap_or_default();
            let (h_a, team_xg) = match entry.side {
                Side::Home => ("h", fixture.home_xg),
                Side::Away => ("a", fixture.away_xg),
            };

            let npxg = entry.xg - f64::from(tally.attempts) * unit;
            out.push(PlayerMatchRecord {
                player_id: entry.player_id,
                fixture_id: detail.fixture_id,
                gameweek: fixture.gameweek,
                team_id,
                player: entry.player.clone(),
                position: entry.position.clone(),
                h_a: h_a.to_string(),
                minutes: entry.minutes,
                goals: entry.goals,
                own_goals: entry.own_goals,
                assists: entry.assists,
                shots: entry.shots,
                key_passes: entry.key_passes,
                yellow_cards: entry.yellow_cards,
                red_cards: entry.red_cards,
                xg: entry.xg,
                xa: entry.xa,
                xg_chain: entry.xg_chain,
                xg_buildup: entry.xg_buildup,
                team_xg,
                penalty_attempts: tally.attempts,
                penalty_scored: tally.scored,
                xgi: entry.xg + entry.xa,
                npxg,
                npxgi: npxg + entry.xa,
            });
        }
    }

    info!(
        fixtures = details.len(),
        rows = out.len(),
        "reconciled player match rows"
    );
    Ok(out)
}

pub fn sort_player_matches(rows: &mut [PlayerMatchRecord]) {
    rows.sort_by_key(|r| (r.gameweek, r.team_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(player_id: u64, situation: &str, result: &str, xg: f64) -> RawShot {
        RawShot {
            player_id,
            situation: situation.to_string(),
            result: result.to_string(),
            xg,
        }
    }

    #[test]
    fn penalty_unit_is_max_penalty_xg() {
        let shots = vec![
            shot(1, "OpenPlay", "Goal", 0.91),
            shot(1, "Penalty", "Goal", 0.76),
            shot(2, "Penalty", "SavedShot", 0.7611),
        ];
        assert_eq!(penalty_unit(&shots), 0.7611);
    }

    #[test]
    fn penalty_unit_without_penalties_is_zero() {
        let shots = vec![shot(1, "OpenPlay", "MissedShots", 0.3)];
        assert_eq!(penalty_unit(&shots), 0.0);
        assert_eq!(penalty_unit(&[]), 0.0);
    }

    #[test]
    fn pending_player_fixtures_skips_recorded() {
        let fixture = |id| Fixture {
            fixture_id: id,
            gameweek: 1,
            home_team_id: 0,
            away_team_id: 1,
            home_xg: 1.0,
            away_xg: 0.5,
            is_result: true,
        };
        let fixtures = vec![fixture(30), fixture(10), fixture(20)];
        let records = vec![PlayerMatchRecord {
            player_id: 1,
            fixture_id: 20,
            gameweek: 1,
            team_id: 0,
            player: "A".to_string(),
            position: "F".to_string(),
            h_a: "h".to_string(),
            minutes: 90,
            goals: 0,
            own_goals: 0,
            assists: 0,
            shots: 0,
            key_passes: 0,
            yellow_cards: 0,
            red_cards: 0,
            xg: 0.0,
            xa: 0.0,
            xg_chain: 0.0,
            xg_buildup: 0.0,
            team_xg: 1.0,
            penalty_attempts: 0,
            penalty_scored: 0,
            xgi: 0.0,
            npxg: 0.0,
            npxgi: 0.0,
        }];
        assert_eq!(pending_player_fixtures(&fixtures, &records), vec![10, 30]);
    }
}
