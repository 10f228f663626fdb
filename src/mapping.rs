use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::player_matches::PlayerMatchRecord;
use crate::sources::RawFplElement;
use crate::store::Record;

/// Teams per season. Team ids are the dense range `0..LEAGUE_SIZE`.
pub const LEAGUE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Understat,
    Fpl,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Understat => write!(f, "understat"),
            Source::Fpl => write!(f, "fpl"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: u32,
    pub name: String,
    pub short_code: String,
    pub understat_id: Option<u32>,
    pub fpl_id: Option<u32>,
}

impl Team {
    pub fn source_id(&self, source: Source) -> Option<u32> {
        match source {
            Source::Understat => self.understat_id,
            Source::Fpl => self.fpl_id,
        }
    }
}

impl Record for Team {
    const TABLE: &'static str = "team_mapping";
    const COLUMNS: &'static [&'static str] =
        &["team_id", "name", "short_code", "understat_id", "fpl_id"];
}

#[derive(Debug, Clone, Default)]
pub struct TeamMapping {
    teams: Vec<Team>,
    by_source: HashMap<(Source, u32), u32>,
}

impl TeamMapping {
    pub fn new(mut teams: Vec<Team>) -> Self {
        teams.sort_by_key(|t| t.team_id);
        let mut by_source = HashMap::new();
        for team in &teams {
            for source in [Source::Understat, Source::Fpl] {
                if let Some(ext) = team.source_id(source) {
                    by_source.insert((source, ext), team.team_id);
                }
            }
        }
        Self { teams, by_source }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn get(&self, team_id: u32) -> Option<&Team> {
        self.teams.iter().find(|t| t.team_id == team_id)
    }

    pub fn resolve(&self, source: Source, external_id: u32) -> Option<u32> {
        self.by_source.get(&(source, external_id)).copied()
    }

    /// Like [`resolve`](Self::resolve), but a miss is fatal for `fixture_id`.
    pub fn resolve_for_fixture(
        &self,
        fixture_id: u64,
        source: Source,
        external_id: u32,
    ) -> Result<u32> {
        self.resolve(source, external_id)
            .ok_or(PipelineError::UnresolvedTeam {
                fixture_id,
                feed: source,
                external_id,
            })
    }

    /// The rating matrix needs every coordinate `0..LEAGUE_SIZE` exactly once.
    pub fn require_complete(&self) -> Result<()> {
        if self.teams.len() != LEAGUE_SIZE {
            return Err(PipelineError::IncompleteTeamMapping {
                reason: format!("expected {LEAGUE_SIZE} teams, found {}", self.teams.len()),
            });
        }
        let mut seen = HashSet::new();
        for team in &self.teams {
            if team.team_id as usize >= LEAGUE_SIZE || !seen.insert(team.team_id) {
                return Err(PipelineError::IncompleteTeamMapping {
                    reason: format!("team_id {} is duplicated or out of range", team.team_id),
                });
            }
        }
        Ok(())
    }
}

/// Cross-reference from the fantasy-game player to the statistics-feed
/// player. `player_id` is set by hand when a player is first seeded and is
/// never changed by a refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMapping {
    pub player_id: Option<u64>,
    pub player: Option<String>,
    pub fpl_id: u32,
    pub fpl_name: String,
    pub web_name: String,
    pub element_type: u8,
    pub pos: String,
    pub now_cost: f64,
    pub penalties_order: Option<u8>,
    pub status: String,
    pub team_id: Option<u32>,
}

impl Record for PlayerMapping {
    const TABLE: &'static str = "player_mapping";
    const COLUMNS: &'static [&'static str] = &[
        "player_id",
        "player",
        "fpl_id",
        "fpl_name",
        "web_name",
        "element_type",
        "pos",
        "now_cost",
        "penalties_order",
        "status",
        "team_id",
    ];
}

pub fn position_code(element_type: u8) -> &'static str {
    match element_type {
        1 => "(G)",
        2 => "(D)",
        3 => "(M)",
        4 => "(F)",
        _ => "(?)",
    }
}

/// An active external player with no internal id.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmappedPlayer {
    pub source: Source,
    pub external_id: u64,
    pub name: String,
    /// Season points (fantasy feed) or minutes played (statistics feed).
    pub activity: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingReport {
    pub unmapped: Vec<UnmappedPlayer>,
}

impl MappingReport {
    pub fn is_empty(&self) -> bool {
        self.unmapped.is_empty()
    }

    pub fn extend(&mut self, other: MappingReport) {
        self.unmapped.extend(other.unmapped);
    }

    pub fn log_warnings(&self) {
        for p in &self.unmapped {
            warn!(
                source = %p.source,
                external_id = p.external_id,
                activity = p.activity,
                "no mapping exists for {}",
                p.name
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct MappingRefresh {
    pub rows: Vec<PlayerMapping>,
    pub report: MappingReport,
}

/// Joined on `fpl_id`. Rows missing from the snapshot survive only if they
/// were ever mapped.
pub fn refresh_player_mapping(
    existing: &[PlayerMapping],
    snapshot: &[RawFplElement],
    teams: &TeamMapping,
) -> MappingRefresh {
    let by_fpl: HashMap<u32, &PlayerMapping> = existing.iter().map(|m| (m.fpl_id, m)).collect();

    let mut rows = Vec::with_capacity(snapshot.len());
    let mut seen = HashSet::new();
    let mut report = MappingReport::default();

    for el in snapshot.iter().filter(|el| el.status != "u") {
        if !seen.insert(el.fpl_id) {
            continue;
        }
        let prior = by_fpl.get(&el.fpl_id);
        let row = PlayerMapping {
            player_id: prior.and_then(|p| p.player_id),
            player: prior.and_then(|p| p.player.clone()),
            fpl_id: el.fpl_id,
            fpl_name: format!("{} {}", el.first_name, el.second_name),
            web_name: el.web_name.clone(),
            element_type: el.element_type,
            pos: position_code(el.element_type).to_string(),
            now_cost: f64::from(el.now_cost) / 10.0,
            penalties_order: prior.and_then(|p| p.penalties_order),
            status: el.status.clone(),
            team_id: teams.resolve(Source::Fpl, el.team),
        };
        if row.player_id.is_none() && el.total_points > 0 {
            report.unmapped.push(UnmappedPlayer {
                source: Source::Fpl,
                external_id: u64::from(el.fpl_id),
                name: el.web_name.clone(),
                activity: i64::from(el.total_points),
            });
        }
        rows.push(row);
    }

    for old in existing {
        if old.player_id.is_some() && !seen.contains(&old.fpl_id) {
            rows.push(old.clone());
            seen.insert(old.fpl_id);
        }
    }

    rows.sort_by_key(|r| r.fpl_id);
    MappingRefresh { rows, report }
}

/// Statistics-feed players who played but have no mapping row.
pub fn unmapped_stat_players(
    records: &[PlayerMatchRecord],
    mapping: &[PlayerMapping],
) -> MappingReport {
    let mapped: HashSet<u64> = mapping.iter().filter_map(|m| m.player_id).collect();

    let mut minutes: HashMap<u64, (String, i64)> = HashMap::new();
    for r in records.iter().filter(|r| r.minutes > 0) {
        if mapped.contains(&r.player_id) {
            continue;
        }
        let entry = minutes
            .entry(r.player_id)
            .or_insert_with(|| (r.player.clone(), 0));
        entry.1 += i64::from(r.minutes);
    }

    let mut unmapped = minutes
        .into_iter()
        .map(|(id, (name, mins))| UnmappedPlayer {
            source: Source::Understat,
            external_id: id,
            name,
            activity: mins,
        })
        .collect::<Vec<_>>();
    unmapped.sort_by(|a, b| b.activity.cmp(&a.activity).then(a.external_id.cmp(&b.external_id)));
    MappingReport { unmapped }
}

pub fn index_by_player_id(mapping: &[PlayerMapping]) -> HashMap<u64, &PlayerMapping> {
    mapping
        .iter()
        .filter_map(|m| m.player_id.map(|id| (id, m)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32) -> Team {
        Team {
            team_id: id,
            name: format!("Team {id}"),
            short_code: format!("T{id:02}"),
            understat_id: Some(70 + id),
            fpl_id: Some(id + 1),
        }
    }

    #[test]
    fn resolves_by_source_id_not_name() {
        let mapping = TeamMapping::new((0..20).map(team).collect());
        assert_eq!(mapping.resolve(Source::Understat, 83), Some(13));
        assert_eq!(mapping.resolve(Source::Fpl, 1), Some(0));
        assert_eq!(mapping.resolve(Source::Understat, 1), None);
    }

    #[test]
    fn unresolved_fixture_team_is_an_error() {
        let mapping = TeamMapping::new((0..20).map(team).collect());
        let err = mapping
            .resolve_for_fixture(22000, Source::Understat, 999)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnresolvedTeam {
                fixture_id: 22000,
                external_id: 999,
                ..
            }
        ));
    }

    #[test]
    fn completeness_requires_dense_twenty() {
        assert!(TeamMapping::new((0..20).map(team).collect()).require_complete().is_ok());
        assert!(TeamMapping::new((0..19).map(team).collect()).require_complete().is_err());

        let mut teams = (0..20).map(team).collect::<Vec<_>>();
        teams[19].team_id = 20;
        assert!(TeamMapping::new(teams).require_complete().is_err());
    }

    #[test]
    fn position_codes() {
        assert_eq!(position_code(1), "(G)");
        assert_eq!(position_code(3), "(M)");
        assert_eq!(position_code(4), "(F)");
        assert_eq!(position_code(9), "(?)");
    }
}
