use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::http_cache::HttpFetcher;
use crate::sources::{
    PlayerInfoSource, RawFplElement, RawLiveElement, as_bool_any, as_i64_any, as_u32_any,
    f64_field, str_field, u32_field,
};

pub const DEFAULT_BASE_URL: &str = "https://fantasy.premierleague.com/api";

/// Blocking client for the fantasy game's public API.
pub struct FplClient {
    http: Arc<HttpFetcher>,
    base_url: String,
}

impl FplClient {
    pub fn new(http: Arc<HttpFetcher>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl PlayerInfoSource for FplClient {
    fn player_snapshot(&self) -> Result<Vec<RawFplElement>> {
        let url = format!("{}/bootstrap-static/", self.base_url);
        let body = self
            .http
            .get_text(&url, &[])
            .context("bootstrap request failed")?;
        parse_bootstrap_json(&body)
    }

    fn live_gameweek(&self, gameweek: u32) -> Result<Vec<RawLiveElement>> {
        let url = format!("{}/event/{gameweek}/live/", self.base_url);
        let body = self
            .http
            .get_text(&url, &[])
            .with_context(|| format!("live request failed for gameweek {gameweek}"))?;
        parse_live_json(&body)
    }
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Vec<RawFplElement>> {
    let v: Value = serde_json::from_str(raw.trim()).context("invalid bootstrap json")?;
    let elements = v
        .get("elements")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("bootstrap payload has no elements"))?;

    let mut out = Vec::with_capacity(elements.len());
    for el in elements {
        let Some(fpl_id) = el.get("id").and_then(as_u32_any) else {
            return Err(anyhow!("bootstrap element without id: {el}"));
        };
        out.push(RawFplElement {
            fpl_id,
            first_name: str_field(el, "first_name"),
            second_name: str_field(el, "second_name"),
            web_name: str_field(el, "web_name"),
            element_type: u8::try_from(u32_field(el, "element_type")).unwrap_or(0),
            now_cost: u32_field(el, "now_cost"),
            status: str_field(el, "status"),
            team: u32_field(el, "team"),
            total_points: i32_field(el, "total_points"),
        });
    }
    Ok(out)
}

pub fn parse_live_json(raw: &str) -> Result<Vec<RawLiveElement>> {
    let v: Value = serde_json::from_str(raw.trim()).context("invalid live json")?;
    let elements = v
        .get("elements")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("live payload has no elements"))?;

    let mut out = Vec::with_capacity(elements.len());
    for el in elements {
        let Some(fpl_id) = el.get("id").and_then(as_u32_any) else {
            return Err(anyhow!("live element without id: {el}"));
        };
        let Some(s) = el.get("stats") else {
            return Err(anyhow!("live element {fpl_id} has no stats"));
        };
        out.push(RawLiveElement {
            fpl_id,
            minutes: u32_field(s, "minutes"),
            goals_scored: u32_field(s, "goals_scored"),
            assists: u32_field(s, "assists"),
            clean_sheets: u32_field(s, "clean_sheets"),
            goals_conceded: u32_field(s, "goals_conceded"),
            own_goals: u32_field(s, "own_goals"),
            penalties_saved: u32_field(s, "penalties_saved"),
            penalties_missed: u32_field(s, "penalties_missed"),
            yellow_cards: u32_field(s, "yellow_cards"),
            red_cards: u32_field(s, "red_cards"),
            saves: u32_field(s, "saves"),
            bonus: u32_field(s, "bonus"),
            bps: i32_field(s, "bps"),
            influence: f64_field(s, "influence"),
            creativity: f64_field(s, "creativity"),
            threat: f64_field(s, "threat"),
            ict_index: f64_field(s, "ict_index"),
            starts: u32_field(s, "starts"),
            expected_goals: f64_field(s, "expected_goals"),
            expected_assists: f64_field(s, "expected_assists"),
            expected_goal_involvements: f64_field(s, "expected_goal_involvements"),
            expected_goals_conceded: f64_field(s, "expected_goals_conceded"),
            total_points: i32_field(s, "total_points"),
            in_dreamteam: s
                .get("in_dreamteam")
                .and_then(as_bool_any)
                .unwrap_or(false),
        });
    }
    Ok(out)
}

fn i32_field(v: &Value, key: &str) -> i32 {
    v.get(key)
        .and_then(as_i64_any)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}
