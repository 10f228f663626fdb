use std::collections::BTreeMap;

use crate::fixtures::Fixture;
use crate::mapping::{
    LEAGUE_SIZE, MappingReport, PlayerMapping, index_by_player_id, unmapped_stat_players,
};
use crate::player_matches::PlayerMatchRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonSummary {
    pub player_id: u64,
    pub fpl_id: u32,
    pub web_name: String,
    pub pos: String,
    pub now_cost: f64,
    pub team_id: u32,
    pub appearances: u32,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub xg: f64,
    pub xa: f64,
    pub xgi: f64,
    pub npxg: f64,
    pub npxgi: f64,
    pub team_xg: f64,
}

impl PlayerSeasonSummary {
    pub fn per90(&self, value: f64) -> f64 {
        if self.minutes == 0 {
            return 0.0;
        }
        value * 90.0 / f64::from(self.minutes)
    }

    /// Non-penalty xGI as a fraction of the team xG across these appearances.
    pub fn npxgi_share(&self) -> f64 {
        if self.team_xg <= 0.0 {
            return 0.0;
        }
        self.npxgi / self.team_xg
    }
}

#[derive(Debug, Clone)]
pub struct PlayerSummaries {
    pub players: Vec<PlayerSeasonSummary>,
    pub report: MappingReport,
}

pub fn player_season_summaries(
    records: &[PlayerMatchRecord],
    mapping: &[PlayerMapping],
    from_gw: u32,
    to_gw: u32,
) -> PlayerSummaries {
    let index = index_by_player_id(mapping);
    let in_range = records
        .iter()
        .filter(|r| r.gameweek >= from_gw && r.gameweek <= to_gw)
        .cloned()
        .collect::<Vec<_>>();

    let mut totals: BTreeMap<u64, PlayerSeasonSummary> = BTreeMap::new();
    for r in &in_range {
        let Some(m) = index.get(&r.player_id) else {
            continue;
        };
        let entry = totals.entry(r.player_id).or_insert_with(|| PlayerSeasonSummary {
            player_id: r.player_id,
            fpl_id: m.fpl_id,
            web_name: m.web_name.clone(),
            pos: m.pos.clone(),
            now_cost: m.now_cost,
            team_id: m.team_id.unwrap_or(r.team_id),
            appearances: 0,
            minutes: 0,
            goals: 0,
            assists: 0,
            xg: 0.0,
            xa: 0.0,
            xgi: 0.0,
            npxg: 0.0,
            npxgi: 0.0,
            team_xg: 0.0,
        });
        entry.appearances += 1;
        entry.minutes += r.minutes;
        entry.goals += r.goals;
        entry.assists += r.assists;
        entry.xg += r.xg;
        entry.xa += r.xa;
        entry.xgi += r.xgi;
        entry.npxg += r.npxg;
        entry.npxgi += r.npxgi;
        entry.team_xg += r.team_xg;
    }

    PlayerSummaries {
        players: totals.into_values().collect(),
        report: unmapped_stat_players(&in_range, mapping),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeamRollup {
    pub team_id: u32,
    pub played: u32,
    pub xg_for: f64,
    pub xg_against: f64,
}

impl TeamRollup {
    pub fn xg_difference(&self) -> f64 {
        self.xg_for - self.xg_against
    }
}

pub fn team_rollups(fixtures: &[Fixture], from_gw: u32, to_gw: u32) -> Vec<TeamRollup> {
    let mut out = (0..LEAGUE_SIZE as u32)
        .map(|team_id| TeamRollup {
            team_id,
            ..TeamRollup::default()
        })
        .collect::<Vec<_>>();

    for f in fixtures
        .iter()
        .filter(|f| f.gameweek >= from_gw && f.gameweek <= to_gw)
    {
        for (team, xg_for, xg_against) in [
            (f.home_team_id, f.home_xg, f.away_xg),
            (f.away_team_id, f.away_xg, f.home_xg),
        ] {
            let Some(row) = out.get_mut(team as usize) else {
                continue;
            };
            row.played += 1;
            row.xg_for += xg_for;
            row.xg_against += xg_against;
        }
    }
    out
}
