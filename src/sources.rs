use anyhow::Result;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct RawTeamRef {
    pub id: u32,
    pub title: String,
    pub short_title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub id: u64,
    pub is_result: bool,
    pub home: RawTeamRef,
    pub away: RawTeamRef,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub home_xg: Option<f64>,
    pub away_xg: Option<f64>,
    /// Kickoff as published by the feed (`YYYY-MM-DD HH:MM:SS`).
    pub datetime: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRosterEntry {
    pub player_id: u64,
    pub player: String,
    /// Statistics-feed team id (not the internal one).
    pub team_id: u32,
    pub side: Side,
    pub position: String,
    pub minutes: u32,
    pub goals: u32,
    pub own_goals: u32,
    pub shots: u32,
    pub key_passes: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub xg: f64,
    pub xa: f64,
    pub xg_chain: f64,
    pub xg_buildup: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawShot {
    pub player_id: u64,
    pub situation: String,
    pub result: String,
    pub xg: f64,
}

impl RawShot {
    pub fn is_penalty(&self) -> bool {
        self.situation.eq_ignore_ascii_case("Penalty")
    }

    pub fn is_goal(&self) -> bool {
        self.result.eq_ignore_ascii_case("Goal")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMatchDetail {
    pub fixture_id: u64,
    pub roster: Vec<RawRosterEntry>,
    pub shots: Vec<RawShot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFplElement {
    pub fpl_id: u32,
    pub first_name: String,
    pub second_name: String,
    pub web_name: String,
    pub element_type: u8,
    /// Price in tenths, as published.
    pub now_cost: u32,
    pub status: String,
    /// 1-based team number in the fantasy game.
    pub team: u32,
    pub total_points: i32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLiveElement {
    pub fpl_id: u32,
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

// An Err from any fetch means nothing from that call is applied.
pub trait MatchSource {
    fn league_matches(&self, season: &str) -> Result<Vec<RawMatch>>;
    fn match_detail(&self, fixture_id: u64) -> Result<RawMatchDetail>;
}

pub trait PlayerInfoSource {
    fn player_snapshot(&self) -> Result<Vec<RawFplElement>>;
    fn live_gameweek(&self, gameweek: u32) -> Result<Vec<RawLiveElement>>;
}

// Both feeds send numbers as JSON numbers or as quoted strings depending on
// the endpoint, so every numeric read goes through these.

pub(crate) fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

pub(crate) fn as_u32_any(v: &Value) -> Option<u32> {
    let n = as_u64_any(v)?;
    u32::try_from(n).ok()
}

pub(crate) fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

pub(crate) fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

pub(crate) fn as_bool_any(v: &Value) -> Option<bool> {
    if let Some(b) = v.as_bool() {
        return Some(b);
    }
    match v.as_str()?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn u32_field(v: &Value, key: &str) -> u32 {
    v.get(key).and_then(as_u32_any).unwrap_or(0)
}

pub(crate) fn f64_field(v: &Value, key: &str) -> f64 {
    v.get(key).and_then(as_f64_any).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_parse_from_strings_or_numbers() {
        assert_eq!(as_u64_any(&json!("22181")), Some(22181));
        assert_eq!(as_u64_any(&json!(22181)), Some(22181));
        assert_eq!(as_f64_any(&json!("0.7611688375473022")), Some(0.7611688375473022));
        assert_eq!(as_i64_any(&json!("-3")), Some(-3));
        assert_eq!(as_u32_any(&json!("x")), None);
        assert_eq!(as_bool_any(&json!("true")), Some(true));
        assert_eq!(as_bool_any(&json!(false)), Some(false));
    }

    #[test]
    fn penalty_shot_flags() {
        let shot = RawShot {
            player_id: 1,
            situation: "Penalty".to_string(),
            result: "Goal".to_string(),
            xg: 0.76,
        };
        assert!(shot.is_penalty());
        assert!(shot.is_goal());
    }
}
