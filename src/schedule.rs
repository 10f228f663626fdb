use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::mapping::{LEAGUE_SIZE, Source, TeamMapping};
use crate::sources::RawMatch;
use crate::store::Record;

pub const FIXTURES_PER_GAMEWEEK: usize = LEAGUE_SIZE / 2;

const KICKOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A fixture of the season calendar, played or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledFixture {
    pub fixture_id: u64,
    pub kickoff: NaiveDateTime,
    pub gameweek: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
}

impl Record for ScheduledFixture {
    const TABLE: &'static str = "season_data";
    const COLUMNS: &'static [&'static str] = &[
        "fixture_id",
        "kickoff",
        "gameweek",
        "home_team_id",
        "away_team_id",
    ];
}

/// Season calendar from the full match list: ordered by kickoff and chunked
/// into gameweeks of [`FIXTURES_PER_GAMEWEEK`].
pub fn build_schedule(matches: &[RawMatch], teams: &TeamMapping) -> Result<Vec<ScheduledFixture>> {
    let mut rows = Vec::with_capacity(matches.len());
    for m in matches {
        let kickoff = NaiveDateTime::parse_from_str(m.datetime.trim(), KICKOFF_FORMAT).map_err(
            |err| PipelineError::SourceFetch {
                step: "season schedule",
                message: format!("fixture {} has bad kickoff {:?}: {err}", m.id, m.datetime),
            },
        )?;
        rows.push(ScheduledFixture {
            fixture_id: m.id,
            kickoff,
            gameweek: 0,
            home_team_id: teams.resolve_for_fixture(m.id, Source::Understat, m.home.id)?,
            away_team_id: teams.resolve_for_fixture(m.id, Source::Understat, m.away.id)?,
        });
    }

    rows.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then(a.fixture_id.cmp(&b.fixture_id)));
    rows.dedup_by_key(|r| r.fixture_id);
    for (idx, row) in rows.iter_mut().enumerate() {
        row.gameweek = (idx / FIXTURES_PER_GAMEWEEK) as u32 + 1;
    }
    info!(
        fixtures = rows.len(),
        gameweeks = rows.last().map(|r| r.gameweek).unwrap_or(0),
        "built season schedule"
    );
    Ok(rows)
}

/// Scheduled fixtures with `from <= gameweek <= to`.
pub fn fixtures_between(schedule: &[ScheduledFixture], from: u32, to: u32) -> Vec<&ScheduledFixture> {
    schedule
        .iter()
        .filter(|f| f.gameweek >= from && f.gameweek <= to)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Team;
    use crate::sources::RawTeamRef;

    fn teams() -> TeamMapping {
        TeamMapping::new(
            (0..20)
                .map(|id| Team {
                    team_id: id,
                    name: format!("Team {id}"),
                    short_code: format!("T{id}"),
                    understat_id: Some(100 + id),
                    fpl_id: Some(id + 1),
                })
                .collect(),
        )
    }

    fn raw(id: u64, home: u32, away: u32, datetime: &str) -> RawMatch {
        let team = |id| RawTeamRef {
            id,
            title: String::new(),
            short_title: String::new(),
        };
        RawMatch {
            id,
            is_result: false,
            home: team(home),
            away: team(away),
            home_goals: None,
            away_goals: None,
            home_xg: None,
            away_xg: None,
            datetime: datetime.to_string(),
        }
    }

    #[test]
    fn gameweeks_follow_kickoff_order() {
        let mut matches = Vec::new();
        for i in 0..20u64 {
            let day = 11 + (19 - i) / 10;
            let hour = 10 + (i % 10);
            matches.push(raw(
                1000 + i,
                100 + (i % 10) as u32,
                110 + (i % 10) as u32,
                &format!("2023-08-{day:02} {hour:02}:00:00"),
            ));
        }
        let schedule = build_schedule(&matches, &teams()).unwrap();
        assert_eq!(schedule.len(), 20);
        assert!(schedule[..10].iter().all(|f| f.gameweek == 1));
        assert!(schedule[10..].iter().all(|f| f.gameweek == 2));
        assert!(schedule[..10].iter().all(|f| f.fixture_id >= 1010));
        assert_eq!(fixtures_between(&schedule, 2, 2).len(), 10);
    }

    #[test]
    fn bad_kickoff_is_rejected() {
        let matches = vec![raw(1, 100, 101, "next saturday")];
        assert!(build_schedule(&matches, &teams()).is_err());
    }
}
