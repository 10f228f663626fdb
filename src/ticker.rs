use std::collections::{BTreeMap, HashMap};

use crate::error::{PipelineError, Result};
use crate::mapping::TeamMapping;
use crate::odm::{Rating, WindowKind, ratings_as_of};
use crate::schedule::{ScheduledFixture, fixtures_between};

pub const DEFAULT_HOME_ADVANTAGE: f64 = 0.33;

const BLANK_PENALTY: f64 = 1.25;

#[derive(Debug, Clone, PartialEq)]
pub struct TickerFixture {
    pub opponent_id: u32,
    pub home: bool,
    /// `vXXX` at home, `@XXX` away.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamTicker {
    pub team_id: u32,
    pub team: String,
    pub fixtures: BTreeMap<u32, Vec<TickerFixture>>,
    pub attack_values: BTreeMap<u32, f64>,
    pub defence_values: BTreeMap<u32, f64>,
    /// 100 is league average.
    pub attack_rating: f64,
    pub defence_rating: f64,
}

#[derive(Debug, Clone, Copy)]
struct Adjusted {
    o: f64,
    d: f64,
}

pub fn fixture_ticker(
    schedule: &[ScheduledFixture],
    teams: &TeamMapping,
    ratings_log: &[Rating],
    window: WindowKind,
    from: u32,
    to: u32,
    home_advantage: f64,
) -> Result<Vec<TeamTicker>> {
    let ratings = ratings_as_of(ratings_log, from, window);
    let by_team: HashMap<u32, &Rating> = ratings.iter().map(|r| (r.team_id, *r)).collect();
    if teams.teams().iter().any(|t| !by_team.contains_key(&t.team_id)) {
        return Err(PipelineError::MissingRatings {
            window,
            gameweek: from,
        });
    }

    let home_factor = 1.0 + home_advantage / 2.0;
    let away_factor = 1.0 - home_advantage / 2.0;
    // Opponent ratings as seen from the other side: `visiting` when the
    // opponent travels, `hosting` when it plays at home.
    let adjust = |r: &Rating, factor: f64| Adjusted {
        o: r.o_rating / factor,
        d: r.d_rating * factor,
    };
    let visiting: HashMap<u32, Adjusted> = by_team
        .iter()
        .map(|(id, r)| (*id, adjust(*r, home_factor)))
        .collect();
    let hosting: HashMap<u32, Adjusted> = by_team
        .iter()
        .map(|(id, r)| (*id, adjust(*r, away_factor)))
        .collect();
    let all = visiting.values().chain(hosting.values());
    let min_d = all.clone().map(|a| a.d).fold(f64::INFINITY, f64::min);
    let max_o = all.map(|a| a.o).fold(0.0, f64::max);

    let in_range = fixtures_between(schedule, from, to);
    let mut rows = Vec::with_capacity(teams.teams().len());
    for team in teams.teams() {
        let mut fixtures: BTreeMap<u32, Vec<TickerFixture>> = BTreeMap::new();
        let mut attack_values = BTreeMap::new();
        let mut defence_values = BTreeMap::new();

        for gw in from..=to {
            let mut attack = 0.0;
            let mut defence = 0.0;
            let mut games = Vec::new();
            for f in in_range.iter().filter(|f| f.gameweek == gw) {
                let (opponent_id, home) = if f.home_team_id == team.team_id {
                    (f.away_team_id, true)
                } else if f.away_team_id == team.team_id {
                    (f.home_team_id, false)
                } else {
                    continue;
                };
                let side = if home { &visiting } else { &hosting };
                let Some(opp) = side.get(&opponent_id) else {
                    continue;
                };
                attack += opp.d;
                defence += opp.o;
                let short = teams
                    .get(opponent_id)
                    .map(|t| t.short_code.as_str())
                    .unwrap_or("???");
                games.push(TickerFixture {
                    opponent_id,
                    home,
                    label: format!("{}{short}", if home { "v" } else { "@" }),
                });
            }
            if games.is_empty() {
                attack = min_d / BLANK_PENALTY;
                defence = max_o * BLANK_PENALTY;
            }
            attack_values.insert(gw, attack);
            defence_values.insert(gw, defence);
            fixtures.insert(gw, games);
        }

        rows.push(TeamTicker {
            team_id: team.team_id,
            team: team.name.clone(),
            fixtures,
            attack_values,
            defence_values,
            attack_rating: 0.0,
            defence_rating: 0.0,
        });
    }

    let sums = rows
        .iter()
        .map(|t| {
            (
                t.attack_values.values().sum::<f64>(),
                t.defence_values.values().sum::<f64>(),
            )
        })
        .collect::<Vec<_>>();
    let n = sums.len().max(1) as f64;
    let attack_mean = sums.iter().map(|s| s.0).sum::<f64>() / n;
    let defence_mean = sums.iter().map(|s| s.1).sum::<f64>() / n;
    for (row, (a, d)) in rows.iter_mut().zip(sums) {
        row.attack_rating = if attack_mean > 0.0 {
            a / attack_mean * 100.0
        } else {
            100.0
        };
        row.defence_rating = if d > 0.0 {
            defence_mean / d * 100.0
        } else {
            100.0
        };
    }
    Ok(rows)
}
