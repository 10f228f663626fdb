use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::sources::RawLiveElement;
use crate::store::Record;

/// Fantasy-game live statistics for one player in one gameweek.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FplLiveRecord {
    pub fpl_id: u32,
    pub gameweek: u32,
    pub minutes: u32,
    pub goals_scored: u32,
    pub assists: u32,
    pub clean_sheets: u32,
    pub goals_conceded: u32,
    pub own_goals: u32,
    pub penalties_saved: u32,
    pub penalties_missed: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub saves: u32,
    pub bonus: u32,
    pub bps: i32,
    pub influence: f64,
    pub creativity: f64,
    pub threat: f64,
    pub ict_index: f64,
    pub starts: u32,
    pub expected_goals: f64,
    pub expected_assists: f64,
    pub expected_goal_involvements: f64,
    pub expected_goals_conceded: f64,
    pub total_points: i32,
    pub in_dreamteam: bool,
}

impl Record for FplLiveRecord {
    const TABLE: &'static str = "fpl_player_data";
    const COLUMNS: &'static [&'static str] = &[
        "fpl_id",
        "gameweek",
        "minutes",
        "goals_scored",
        "assists",
        "clean_sheets",
        "goals_conceded",
        "own_goals",
        "penalties_saved",
        "penalties_missed",
        "yellow_cards",
        "red_cards",
        "saves",
        "bonus",
        "bps",
        "influence",
        "creativity",
        "threat",
        "ict_index",
        "starts",
        "expected_goals",
        "expected_assists",
        "expected_goal_involvements",
        "expected_goals_conceded",
        "total_points",
        "in_dreamteam",
    ];
}

/// Rows for `(fpl_id, gameweek)` pairs not recorded yet.
pub fn reconcile_live(
    raw: &[RawLiveElement],
    recorded: &[FplLiveRecord],
    gameweek: u32,
) -> Vec<FplLiveRecord> {
    let mut seen: HashSet<(u32, u32)> = recorded.iter().map(|r| (r.fpl_id, r.gameweek)).collect();
    raw.iter()
        .filter(|el| seen.insert((el.fpl_id, gameweek)))
        .map(|el| FplLiveRecord {
            fpl_id: el.fpl_id,
            gameweek,
            minutes: el.minutes,
            goals_scored: el.goals_scored,
            assists: el.assists,
            clean_sheets: el.clean_sheets,
            goals_conceded: el.goals_conceded,
            own_goals: el.own_goals,
            penalties_saved: el.penalties_saved,
            penalties_missed: el.penalties_missed,
            yellow_cards: el.yellow_cards,
            red_cards: el.red_cards,
            saves: el.saves,
            bonus: el.bonus,
            bps: el.bps,
            influence: el.influence,
            creativity: el.creativity,
            threat: el.threat,
            ict_index: el.ict_index,
            starts: el.starts,
            expected_goals: el.expected_goals,
            expected_assists: el.expected_assists,
            expected_goal_involvements: el.expected_goal_involvements,
            expected_goals_conceded: el.expected_goals_conceded,
            total_points: el.total_points,
            in_dreamteam: el.in_dreamteam,
        })
        .collect()
}
