use std::fs;
use std::path::PathBuf;

use fplalytics::fpl::{parse_bootstrap_json, parse_live_json};
use fplalytics::sources::Side;
use fplalytics::understat::{parse_league_matches_json, parse_match_detail_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_league_matches_fixture() {
    let raw = read_fixture("understat_league.json");
    let rows = parse_league_matches_json(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].id, 22275);
    assert!(rows[0].is_result);
    assert_eq!(rows[0].home.id, 87);
    assert_eq!(rows[0].away.short_title, "MCI");
    assert_eq!(rows[0].away_goals, Some(3));
    assert!((rows[0].away_xg.unwrap() - 2.40074).abs() < 1e-9);

    // Numbers and quoted numbers are both accepted.
    assert_eq!(rows[1].home_goals, Some(2));
    assert_eq!(rows[1].home_xg, Some(0.8));

    assert!(!rows[2].is_result);
    assert_eq!(rows[2].home_xg, None);
    assert_eq!(rows[2].datetime, "2023-10-08 16:30:00");
}

#[test]
fn league_payload_accepts_bare_array() {
    let raw = r#"[{"id": 5, "isResult": "true", "h": {"id": 1}, "a": {"id": 2},
        "xG": {"h": "1.0", "a": "0.5"}, "datetime": "2023-08-11 19:00:00"}]"#;
    let rows = parse_league_matches_json(raw).expect("bare array should parse");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_result);
    assert_eq!(rows[0].home_goals, None);
}

#[test]
fn rejects_match_without_teams() {
    let raw = r#"{"dates": [{"id": "9", "isResult": true}]}"#;
    let err = parse_league_matches_json(raw).unwrap_err();
    assert!(err.to_string().contains("malformed match record"));
}

#[test]
fn parses_match_detail_fixture() {
    let raw = read_fixture("understat_match.json");
    let detail = parse_match_detail_json(22276, &raw).expect("fixture should parse");
    assert_eq!(detail.fixture_id, 22276);
    assert_eq!(detail.roster.len(), 3);

    let saka = &detail.roster[0];
    assert_eq!(saka.player_id, 1250);
    assert_eq!(saka.side, Side::Home);
    assert_eq!(saka.team_id, 71);
    assert_eq!(saka.minutes, 90);
    assert_eq!(saka.key_passes, 2);
    assert!((saka.xg_chain - 1.4).abs() < 1e-9);

    let awoniyi = &detail.roster[2];
    assert_eq!(awoniyi.side, Side::Away);
    assert_eq!(awoniyi.yellow_cards, 1);

    assert_eq!(detail.shots.len(), 3);
    let penalties = detail.shots.iter().filter(|s| s.is_penalty()).count();
    assert_eq!(penalties, 1);
    assert!(detail.shots[0].is_goal());
    assert!((detail.shots[0].xg - 0.7611).abs() < 1e-9);
}

#[test]
fn match_detail_without_rosters_is_an_error() {
    let err = parse_match_detail_json(1, r#"{"shots": {}}"#).unwrap_err();
    assert!(err.to_string().contains("no rosters"));
}

#[test]
fn parses_bootstrap_fixture() {
    let raw = read_fixture("fpl_bootstrap.json");
    let elements = parse_bootstrap_json(&raw).expect("fixture should parse");
    assert_eq!(elements.len(), 4);
    assert_eq!(elements[1].web_name, "Saka");
    assert_eq!(elements[1].element_type, 3);
    assert_eq!(elements[1].now_cost, 90);

    let awoniyi = &elements[2];
    assert_eq!(awoniyi.team, 16);
    assert_eq!(awoniyi.now_cost, 65);
    assert_eq!(awoniyi.total_points, -1);
    assert_eq!(elements[3].status, "u");
}

#[test]
fn parses_live_fixture() {
    let raw = read_fixture("fpl_live.json");
    let live = parse_live_json(&raw).expect("fixture should parse");
    assert_eq!(live.len(), 2);

    let saka = &live[0];
    assert_eq!(saka.fpl_id, 19);
    assert_eq!(saka.bonus, 3);
    assert!(saka.in_dreamteam);
    assert!((saka.ict_index - 14.1).abs() < 1e-9);
    assert!((saka.expected_goal_involvements - 1.5).abs() < 1e-9);

    // Missing stats default to zero.
    let awoniyi = &live[1];
    assert_eq!(awoniyi.bps, -2);
    assert_eq!(awoniyi.clean_sheets, 0);
    assert!(!awoniyi.in_dreamteam);
}

#[test]
fn live_element_without_stats_is_an_error() {
    let err = parse_live_json(r#"{"elements": [{"id": 3}]}"#).unwrap_err();
    assert!(err.to_string().contains("no stats"));
}
