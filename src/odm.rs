use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::fixtures::Fixture;
use crate::mapping::{LEAGUE_SIZE, TeamMapping};
use crate::store::Record;

pub type ScoreMatrix = [[f64; LEAGUE_SIZE]; LEAGUE_SIZE];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdmConfig {
    pub iterations: usize,
    /// Seed added to every matrix cell so no row or column is ever zero.
    pub epsilon: f64,
    pub scale: f64,
    /// Length of the trailing form window, in gameweeks.
    pub form_gameweeks: u32,
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            epsilon: 1e-4,
            scale: 100.0,
            form_gameweeks: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Season,
    Form,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Season => write!(f, "season"),
            WindowKind::Form => write!(f, "form"),
        }
    }
}

/// Gameweek bounds of a rating window: `start <= gameweek < end`, with no
/// lower bound when `start` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingWindow {
    pub start: Option<u32>,
    pub end: u32,
}

impl RatingWindow {
    pub fn full_season(target_gw: u32) -> Self {
        Self {
            start: None,
            end: target_gw,
        }
    }

    pub fn trailing(target_gw: u32, gameweeks: u32) -> Self {
        Self {
            start: Some(target_gw.saturating_sub(gameweeks)),
            end: target_gw,
        }
    }

    pub fn for_kind(kind: WindowKind, target_gw: u32, cfg: &OdmConfig) -> Self {
        match kind {
            WindowKind::Season => Self::full_season(target_gw),
            WindowKind::Form => Self::trailing(target_gw, cfg.form_gameweeks),
        }
    }

    pub fn contains(&self, gameweek: u32) -> bool {
        gameweek < self.end && self.start.is_none_or(|s| gameweek >= s)
    }

    pub fn select<'a>(&self, fixtures: &'a [Fixture]) -> Vec<&'a Fixture> {
        fixtures
            .iter()
            .filter(|f| self.contains(f.gameweek))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OdmRatings {
    pub offense: [f64; LEAGUE_SIZE],
    pub defense: [f64; LEAGUE_SIZE],
    residual: f64,
}

impl OdmRatings {
    /// Largest relative change of any offensive rating over the final round.
    pub fn residual(&self) -> f64 {
        self.residual
    }
}

// a[i][j] is the xG team j produced against team i.
pub fn score_matrix(fixtures: &[&Fixture], cfg: &OdmConfig) -> Result<ScoreMatrix> {
    let mut a = [[cfg.epsilon; LEAGUE_SIZE]; LEAGUE_SIZE];
    for f in fixtures {
        let h = team_index(f.home_team_id, f.fixture_id)?;
        let w = team_index(f.away_team_id, f.fixture_id)?;
        a[h][w] += f.away_xg * cfg.scale;
        a[w][h] += f.home_xg * cfg.scale;
    }
    Ok(a)
}

fn team_index(team_id: u32, fixture_id: u64) -> Result<usize> {
    let idx = team_id as usize;
    if idx >= LEAGUE_SIZE {
        return Err(PipelineError::IncompleteTeamMapping {
            reason: format!("fixture {fixture_id} references team_id {team_id} outside the league"),
        });
    }
    Ok(idx)
}

pub fn solve(a: &ScoreMatrix, iterations: usize) -> OdmRatings {
    let mut o = [1.0; LEAGUE_SIZE];
    let mut d = [1.0; LEAGUE_SIZE];
    let mut residual = 0.0;

    for round in 0..iterations {
        let prev = o;
        for j in 0..LEAGUE_SIZE {
            o[j] = (0..LEAGUE_SIZE).map(|i| a[i][j] / d[i]).sum();
        }
        for i in 0..LEAGUE_SIZE {
            d[i] = (0..LEAGUE_SIZE).map(|j| a[i][j] / o[j]).sum();
        }
        if round + 1 == iterations {
            residual = o
                .iter()
                .zip(prev.iter())
                .map(|(now, before)| ((now - before) / now).abs())
                .fold(0.0, f64::max);
        }
    }

    OdmRatings {
        offense: o,
        defense: d,
        residual,
    }
}

pub fn compute_window(
    fixtures: &[Fixture],
    teams: &TeamMapping,
    window: RatingWindow,
    cfg: &OdmConfig,
) -> Result<OdmRatings> {
    teams.require_complete()?;
    let selected = window.select(fixtures);
    for f in &selected {
        for team_id in [f.home_team_id, f.away_team_id] {
            if teams.get(team_id).is_none() {
                return Err(PipelineError::IncompleteTeamMapping {
                    reason: format!(
                        "fixture {} references unmapped team_id {team_id}",
                        f.fixture_id
                    ),
                });
            }
        }
    }

    let a = score_matrix(&selected, cfg)?;
    let ratings = solve(&a, cfg.iterations);
    debug!(
        fixtures = selected.len(),
        start = ?window.start,
        end = window.end,
        residual = ratings.residual(),
        "odm window solved"
    );
    Ok(ratings)
}

/// One row of the append-only ratings log: a team's strength immediately
/// before `gameweek` is played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub team_id: u32,
    pub team: String,
    pub gameweek: u32,
    pub window: WindowKind,
    pub o_rating: f64,
    pub d_rating: f64,
}

impl Record for Rating {
    const TABLE: &'static str = "odm_rating";
    const COLUMNS: &'static [&'static str] =
        &["team_id", "team", "gameweek", "window", "o_rating", "d_rating"];
}

pub fn compute_gameweek_ratings(
    fixtures: &[Fixture],
    teams: &TeamMapping,
    target_gw: u32,
    cfg: &OdmConfig,
) -> Result<Vec<Rating>> {
    let mut out = Vec::with_capacity(LEAGUE_SIZE * 2);
    for kind in [WindowKind::Season, WindowKind::Form] {
        let window = RatingWindow::for_kind(kind, target_gw, cfg);
        let ratings = compute_window(fixtures, teams, window, cfg)?;
        for team in teams.teams() {
            let idx = team.team_id as usize;
            out.push(Rating {
                team_id: team.team_id,
                team: team.name.clone(),
                gameweek: target_gw,
                window: kind,
                o_rating: ratings.offense[idx],
                d_rating: ratings.defense[idx],
            });
        }
    }
    Ok(out)
}

pub fn has_ratings_for(log: &[Rating], gameweek: u32, window: WindowKind) -> bool {
    log.iter()
        .any(|r| r.gameweek == gameweek && r.window == window)
}

pub fn ratings_as_of(log: &[Rating], gameweek: u32, window: WindowKind) -> Vec<&Rating> {
    let Some(stamp) = log
        .iter()
        .filter(|r| r.window == window && r.gameweek <= gameweek)
        .map(|r| r.gameweek)
        .max()
    else {
        return Vec::new();
    };
    let mut out = log
        .iter()
        .filter(|r| r.window == window && r.gameweek == stamp)
        .collect::<Vec<_>>();
    out.sort_by_key(|r| r.team_id);
    out
}
