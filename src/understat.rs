use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::http_cache::HttpFetcher;
use crate::sources::{
    MatchSource, RawMatch, RawMatchDetail, RawRosterEntry, RawShot, RawTeamRef, Side, as_bool_any,
    as_f64_any, as_u32_any, as_u64_any, f64_field, str_field, u32_field,
};

pub const DEFAULT_BASE_URL: &str = "https://understat.com";
pub const LEAGUE: &str = "EPL";

const AJAX_HEADERS: &[(&str, &str)] = &[("X-Requested-With", "XMLHttpRequest")];

/// Blocking client for the statistics feed.
pub struct UnderstatClient {
    http: Arc<HttpFetcher>,
    base_url: String,
    league: String,
}

impl UnderstatClient {
    pub fn new(http: Arc<HttpFetcher>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            league: LEAGUE.to_string(),
        }
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}/{path}", self.base_url);
        self.http.get_text(&url, AJAX_HEADERS)
    }
}

impl MatchSource for UnderstatClient {
    fn league_matches(&self, season: &str) -> Result<Vec<RawMatch>> {
        let body = self
            .get(&format!("getLeagueData/{}/{season}", self.league))
            .context("league data request failed")?;
        parse_league_matches_json(&body)
    }

    fn match_detail(&self, fixture_id: u64) -> Result<RawMatchDetail> {
        let body = self
            .get(&format!("getMatchData/{fixture_id}"))
            .with_context(|| format!("match data request failed for {fixture_id}"))?;
        parse_match_detail_json(fixture_id, &body)
    }
}

/// Accepts either the league payload (`{"dates": [...]}`) or the bare array.
pub fn parse_league_matches_json(raw: &str) -> Result<Vec<RawMatch>> {
    let v: Value = serde_json::from_str(raw.trim()).context("invalid league json")?;
    let arr = v
        .get("dates")
        .and_then(|d| d.as_array())
        .or_else(|| v.as_array())
        .ok_or_else(|| anyhow!("league payload has no match list"))?;

    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        let m = parse_match(item).ok_or_else(|| {
            anyhow!(
                "malformed match record: {}",
                item.get("id").map(|x| x.to_string()).unwrap_or_default()
            )
        })?;
        out.push(m);
    }
    Ok(out)
}

fn parse_match(v: &Value) -> Option<RawMatch> {
    let id = as_u64_any(v.get("id")?)?;
    let home = parse_team_ref(v.get("h")?)?;
    let away = parse_team_ref(v.get("a")?)?;
    let is_result = v.get("isResult").and_then(as_bool_any).unwrap_or(false);
    let goals = v.get("goals");
    let xg = v.get("xG");
    let side = |obj: Option<&Value>, key: &str| obj.and_then(|o| o.get(key)).cloned();

    Some(RawMatch {
        id,
        is_result,
        home,
        away,
        home_goals: side(goals, "h").as_ref().and_then(as_u32_any),
        away_goals: side(goals, "a").as_ref().and_then(as_u32_any),
        home_xg: side(xg, "h").as_ref().and_then(as_f64_any),
        away_xg: side(xg, "a").as_ref().and_then(as_f64_any),
        datetime: str_field(v, "datetime"),
    })
}

fn parse_team_ref(v: &Value) -> Option<RawTeamRef> {
    Some(RawTeamRef {
        id: as_u32_any(v.get("id")?)?,
        title: str_field(v, "title"),
        short_title: str_field(v, "short_title"),
    })
}

/// Parses `{"rosters": {"h": {..}, "a": {..}}, "shots": {"h": [..], "a": [..]}}`.
pub fn parse_match_detail_json(fixture_id: u64, raw: &str) -> Result<RawMatchDetail> {
    let v: Value = serde_json::from_str(raw.trim()).context("invalid match json")?;
    let rosters = v
        .get("rosters")
        .ok_or_else(|| anyhow!("match {fixture_id} payload has no rosters"))?;

    let mut roster = Vec::new();
    for (key, side) in [("h", Side::Home), ("a", Side::Away)] {
        let Some(players) = rosters.get(key) else {
            continue;
        };
        // Rosters are objects keyed by roster id; tolerate arrays too.
        let entries: Vec<&Value> = match players {
            Value::Object(map) => map.values().collect(),
            Value::Array(arr) => arr.iter().collect(),
            _ => Vec::new(),
        };
        for entry in entries {
            let parsed = parse_roster_entry(entry, side).ok_or_else(|| {
                anyhow!("match {fixture_id}: malformed roster entry {entry}")
            })?;
            roster.push(parsed);
        }
    }
    roster.sort_by_key(|r| r.player_id);

    let mut shots = Vec::new();
    if let Some(all) = v.get("shots") {
        for key in ["h", "a"] {
            for shot in all.get(key).and_then(|s| s.as_array()).into_iter().flatten() {
                let Some(player_id) = shot.get("player_id").and_then(as_u64_any) else {
                    continue;
                };
                shots.push(RawShot {
                    player_id,
                    situation: str_field(shot, "situation"),
                    result: str_field(shot, "result"),
                    xg: f64_field(shot, "xG"),
                });
            }
        }
    }

    Ok(RawMatchDetail {
        fixture_id,
        roster,
        shots,
    })
}

fn parse_roster_entry(v: &Value, side: Side) -> Option<RawRosterEntry> {
    Some(RawRosterEntry {
        player_id: as_u64_any(v.get("player_id")?)?,
        player: str_field(v, "player"),
        team_id: as_u32_any(v.get("team_id")?)?,
        side,
        position: str_field(v, "position"),
        minutes: u32_field(v, "time"),
        goals: u32_field(v, "goals"),
        own_goals: u32_field(v, "own_goals"),
        shots: u32_field(v, "shots"),
        key_passes: u32_field(v, "key_passes"),
        assists: u32_field(v, "assists"),
        yellow_cards: u32_field(v, "yellow_card"),
        red_cards: u32_field(v, "red_card"),
        xg: f64_field(v, "xG"),
        xa: f64_field(v, "xA"),
        xg_chain: f64_field(v, "xGChain"),
        xg_buildup: f64_field(v, "xGBuildup"),
    })
}
