#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;

use anyhow::{Result, anyhow};

use fplalytics::mapping::{Team, TeamMapping};
use fplalytics::sources::{
    MatchSource, PlayerInfoSource, RawFplElement, RawLiveElement, RawMatch, RawMatchDetail,
    RawRosterEntry, RawShot, RawTeamRef, Side,
};
use fplalytics::store::{MemoryStore, Record, encode_rows};

/// Statistics-feed ids are `70 + team_id`, fantasy ids `team_id + 1`.
pub fn understat_id(team_id: u32) -> u32 {
    70 + team_id
}

pub fn league_teams() -> Vec<Team> {
    (0..20)
        .map(|id| Team {
            team_id: id,
            name: format!("Team {id}"),
            short_code: format!("T{id:02}"),
            understat_id: Some(understat_id(id)),
            fpl_id: Some(id + 1),
        })
        .collect()
}

pub fn league_mapping() -> TeamMapping {
    TeamMapping::new(league_teams())
}

pub fn seeded_store() -> MemoryStore {
    let bytes = encode_rows(&league_teams()).expect("teams encode");
    let text = String::from_utf8(bytes).expect("utf8 csv");
    MemoryStore::new().with_table(Team::TABLE, &text)
}

pub fn raw_match(id: u64, home: u32, away: u32, xg: Option<(f64, f64)>) -> RawMatch {
    let team = |team_id: u32| RawTeamRef {
        id: understat_id(team_id),
        title: format!("Team {team_id}"),
        short_title: format!("T{team_id:02}"),
    };
    RawMatch {
        id,
        is_result: xg.is_some(),
        home: team(home),
        away: team(away),
        home_goals: xg.map(|_| 1),
        away_goals: xg.map(|_| 0),
        home_xg: xg.map(|x| x.0),
        away_xg: xg.map(|x| x.1),
        datetime: format!("2023-08-{:02} 15:00:00", 11 + id % 15),
    }
}

pub fn roster_entry(player_id: u64, team_id: u32, side: Side, minutes: u32, xg: f64, xa: f64) -> RawRosterEntry {
    RawRosterEntry {
        player_id,
        player: format!("Player {player_id}"),
        team_id: understat_id(team_id),
        side,
        position: "FW".to_string(),
        minutes,
        goals: 0,
        own_goals: 0,
        shots: 0,
        key_passes: 0,
        assists: 0,
        yellow_cards: 0,
        red_cards: 0,
        xg,
        xa,
        xg_chain: xg + xa,
        xg_buildup: 0.0,
    }
}

pub fn shot(player_id: u64, situation: &str, result: &str, xg: f64) -> RawShot {
    RawShot {
        player_id,
        situation: situation.to_string(),
        result: result.to_string(),
        xg,
    }
}

/// A simple two-player detail: one home starter, one away starter.
pub fn simple_detail(fixture_id: u64, home: u32, away: u32) -> RawMatchDetail {
    RawMatchDetail {
        fixture_id,
        roster: vec![
            roster_entry(fixture_id * 10 + 1, home, Side::Home, 90, 0.4, 0.1),
            roster_entry(fixture_id * 10 + 2, away, Side::Away, 90, 0.2, 0.0),
        ],
        shots: Vec::new(),
    }
}

pub fn element(fpl_id: u32, web_name: &str, element_type: u8, team: u32, total_points: i32) -> RawFplElement {
    RawFplElement {
        fpl_id,
        first_name: "First".to_string(),
        second_name: web_name.to_string(),
        web_name: web_name.to_string(),
        element_type,
        now_cost: 55,
        status: "a".to_string(),
        team,
        total_points,
    }
}

/// In-process stand-in for both feeds.
#[derive(Default)]
pub struct FakeFeeds {
    pub matches: Vec<RawMatch>,
    pub details: HashMap<u64, RawMatchDetail>,
    pub snapshot: Vec<RawFplElement>,
    pub live: Vec<RawLiveElement>,
    pub fail_league: bool,
    pub fail_detail_for: Option<u64>,
    pub fail_snapshot: bool,
    pub detail_calls: Cell<usize>,
}

impl MatchSource for FakeFeeds {
    fn league_matches(&self, _season: &str) -> Result<Vec<RawMatch>> {
        if self.fail_league {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.matches.clone())
    }

    fn match_detail(&self, fixture_id: u64) -> Result<RawMatchDetail> {
        self.detail_calls.set(self.detail_calls.get() + 1);
        if self.fail_detail_for == Some(fixture_id) {
            return Err(anyhow!("timeout fetching {fixture_id}"));
        }
        self.details
            .get(&fixture_id)
            .cloned()
            .ok_or_else(|| anyhow!("no detail for {fixture_id}"))
    }
}

impl PlayerInfoSource for FakeFeeds {
    fn player_snapshot(&self) -> Result<Vec<RawFplElement>> {
        if self.fail_snapshot {
            return Err(anyhow!("bootstrap unavailable"));
        }
        Ok(self.snapshot.clone())
    }

    fn live_gameweek(&self, _gameweek: u32) -> Result<Vec<RawLiveElement>> {
        Ok(self.live.clone())
    }
}
