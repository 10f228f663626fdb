use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::mapping::{Source, TeamMapping};
use crate::sources::RawMatch;
use crate::store::Record;

/// A completed match. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: u64,
    pub gameweek: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_xg: f64,
    pub away_xg: f64,
    pub is_result: bool,
}

impl Record for Fixture {
    const TABLE: &'static str = "fixture_data";
    const COLUMNS: &'static [&'static str] = &[
        "fixture_id",
        "gameweek",
        "home_team_id",
        "away_team_id",
        "home_xg",
        "away_xg",
        "is_result",
    ];
}

pub fn pending_fixture_ids(source: &[RawMatch], recorded: &[Fixture]) -> HashSet<u64> {
    let recorded: HashSet<u64> = recorded.iter().map(|f| f.fixture_id).collect();
    source
        .iter()
        .filter(|m| m.is_result)
        .map(|m| m.id)
        .filter(|id| !recorded.contains(id))
        .collect()
}

/// Any unmapped team fails the whole batch.
pub fn reconcile_fixtures(
    source: &[RawMatch],
    recorded: &[Fixture],
    teams: &TeamMapping,
    gameweek: u32,
) -> Result<Vec<Fixture>> {
    let pending = pending_fixture_ids(source, recorded);

    let mut out = Vec::with_capacity(pending.len());
    let mut emitted = HashSet::new();
    for m in source.iter().filter(|m| pending.contains(&m.id)) {
        if !emitted.insert(m.id) {
            continue;
        }
        let home_team_id = teams.resolve_for_fixture(m.id, Source::Understat, m.home.id)?;
        let away_team_id = teams.resolve_for_fixture(m.id, Source::Understat, m.away.id)?;
        let (Some(home_xg), Some(away_xg)) = (m.home_xg, m.away_xg) else {
            return Err(PipelineError::MissingExpectedGoals { fixture_id: m.id });
        };
        debug!(
            fixture_id = m.id,
            home = %m.home.title,
            away = %m.away.title,
            gameweek,
            "new fixture"
        );
        out.push(Fixture {
            fixture_id: m.id,
            gameweek,
            home_team_id,
            away_team_id,
            home_xg,
            away_xg,
            is_result: true,
        });
    }

    out.sort_by_key(|f| f.fixture_id);
    Ok(out)
}
