mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use fplalytics::error::PipelineError;
use fplalytics::fixtures::Fixture;
use fplalytics::mapping::TeamMapping;
use fplalytics::odm::{
    OdmConfig, Rating, RatingWindow, WindowKind, compute_gameweek_ratings, compute_window,
    has_ratings_for, ratings_as_of,
};

use common::{league_mapping, league_teams};

fn fixture(id: u64, gameweek: u32, home: u32, away: u32, home_xg: f64, away_xg: f64) -> Fixture {
    Fixture {
        fixture_id: id,
        gameweek,
        home_team_id: home,
        away_team_id: away,
        home_xg,
        away_xg,
        is_result: true,
    }
}

fn three_fixtures() -> Vec<Fixture> {
    vec![
        fixture(1, 1, 0, 1, 3.0, 0.2),
        fixture(2, 2, 2, 3, 1.0, 1.0),
        fixture(3, 3, 4, 5, 0.5, 2.5),
    ]
}

fn season_block(rows: &[Rating]) -> Vec<&Rating> {
    rows.iter().filter(|r| r.window == WindowKind::Season).collect()
}

#[test]
fn three_fixtures_rate_the_whole_league() {
    let teams = league_mapping();
    let rows = compute_gameweek_ratings(&three_fixtures(), &teams, 4, &OdmConfig::default()).unwrap();

    assert_eq!(rows.len(), 40);
    for kind in [WindowKind::Season, WindowKind::Form] {
        let block = rows.iter().filter(|r| r.window == kind).collect::<Vec<_>>();
        assert_eq!(block.len(), 20);
        let ids = block.iter().map(|r| r.team_id).collect::<Vec<_>>();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
    }
    for r in &rows {
        assert_eq!(r.gameweek, 4);
        assert!(r.o_rating.is_finite() && r.o_rating > 0.0, "{r:?}");
        assert!(r.d_rating.is_finite() && r.d_rating > 0.0, "{r:?}");
    }

    // Teams with no fixtures see identical matrix columns and rows.
    let season = season_block(&rows);
    for idle in &season[7..] {
        assert_eq!(idle.o_rating, season[6].o_rating);
        assert_eq!(idle.d_rating, season[6].d_rating);
    }
}

#[test]
fn three_team_cycle_rates_the_whole_league() {
    let teams = league_mapping();
    let fixtures = vec![
        fixture(1, 1, 0, 1, 2.0, 1.0),
        fixture(2, 2, 1, 2, 1.0, 0.0),
        fixture(3, 3, 2, 0, 1.0, 0.0),
    ];
    let rows = compute_gameweek_ratings(&fixtures, &teams, 4, &OdmConfig::default()).unwrap();

    let season = season_block(&rows);
    assert_eq!(season.len(), 20);
    for r in &season {
        assert!(r.o_rating.is_finite() && r.o_rating > 0.0, "{r:?}");
        assert!(r.d_rating.is_finite() && r.d_rating > 0.0, "{r:?}");
    }
    for idle in &season[3..] {
        assert_eq!(idle.o_rating, season[3].o_rating);
        assert_eq!(idle.d_rating, season[3].d_rating);
    }
    assert!(season[1].o_rating > season[0].o_rating);
    assert!(season[0].o_rating > season[2].o_rating);
    assert!(season[2].o_rating > season[3].o_rating);
}

#[test]
fn fixtures_at_or_after_target_are_ignored() {
    let teams = league_mapping();
    let cfg = OdmConfig {
        iterations: 300,
        ..OdmConfig::default()
    };
    let mut fixtures = three_fixtures();
    let before = compute_gameweek_ratings(&fixtures, &teams, 4, &cfg).unwrap();

    fixtures.push(fixture(4, 4, 0, 2, 4.0, 0.1));
    fixtures.push(fixture(5, 7, 3, 1, 0.1, 4.0));
    let after = compute_gameweek_ratings(&fixtures, &teams, 4, &cfg).unwrap();
    assert_eq!(before, after);
}

#[test]
fn form_window_only_sees_trailing_gameweeks() {
    let teams = league_mapping();
    let cfg = OdmConfig {
        iterations: 300,
        ..OdmConfig::default()
    };
    let recent = vec![
        fixture(20, 5, 6, 7, 1.1, 0.4),
        fixture(21, 9, 8, 9, 0.3, 2.0),
    ];
    let mut all = vec![fixture(10, 1, 0, 1, 5.0, 0.1), fixture(11, 3, 2, 3, 0.2, 3.3)];
    all.extend(recent.clone());

    let window = RatingWindow::for_kind(WindowKind::Form, 10, &cfg);
    assert_eq!(window.start, Some(4));
    let from_all = compute_window(&all, &teams, window, &cfg).unwrap();
    let from_recent = compute_window(&recent, &teams, window, &cfg).unwrap();
    assert_eq!(from_all, from_recent);
}

#[test]
fn input_order_does_not_change_ratings() {
    let teams = league_mapping();
    let cfg = OdmConfig {
        iterations: 500,
        ..OdmConfig::default()
    };
    let mut fixtures = Vec::new();
    let mut id = 0;
    for gw in 1..=5u32 {
        for pair in 0..10u32 {
            id += 1;
            let home = (pair * 2 + gw) % 20;
            let away = (pair * 2 + 1 + gw * 3) % 20;
            if home == away {
                continue;
            }
            let xg = f64::from((pair + gw) % 7) * 0.35 + 0.1;
            fixtures.push(fixture(id, gw, home, away, xg, 2.6 - xg.min(2.5)));
        }
    }
    let baseline = compute_gameweek_ratings(&fixtures, &teams, 6, &cfg).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..3 {
        fixtures.shuffle(&mut rng);
        let shuffled = compute_gameweek_ratings(&fixtures, &teams, 6, &cfg).unwrap();
        for (a, b) in baseline.iter().zip(&shuffled) {
            assert_eq!((a.team_id, a.window), (b.team_id, b.window));
            assert!((a.o_rating - b.o_rating).abs() <= 1e-9 * a.o_rating.max(1.0));
            assert!((a.d_rating - b.d_rating).abs() <= 1e-9 * a.d_rating.max(1.0));
        }
    }
}

#[test]
fn incomplete_team_mapping_is_refused() {
    let mut teams = league_teams();
    teams.pop();
    let teams = TeamMapping::new(teams);
    let err = compute_gameweek_ratings(&three_fixtures(), &teams, 4, &OdmConfig::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteTeamMapping { .. }));
}

#[test]
fn fixture_outside_the_league_is_refused() {
    let teams = league_mapping();
    let fixtures = vec![fixture(1, 1, 0, 31, 1.0, 1.0)];
    let err = compute_gameweek_ratings(&fixtures, &teams, 2, &OdmConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteTeamMapping { .. }));
}

#[test]
fn ratings_log_lookup_picks_latest_stamp() {
    let teams = league_mapping();
    let cfg = OdmConfig {
        iterations: 100,
        ..OdmConfig::default()
    };
    let fixtures = three_fixtures();
    let mut log = compute_gameweek_ratings(&fixtures, &teams, 2, &cfg).unwrap();
    log.extend(compute_gameweek_ratings(&fixtures, &teams, 4, &cfg).unwrap());

    assert!(has_ratings_for(&log, 4, WindowKind::Form));
    assert!(!has_ratings_for(&log, 3, WindowKind::Season));

    let at3 = ratings_as_of(&log, 3, WindowKind::Season);
    assert_eq!(at3.len(), 20);
    assert!(at3.iter().all(|r| r.gameweek == 2));

    let at9 = ratings_as_of(&log, 9, WindowKind::Form);
    assert!(at9.iter().all(|r| r.gameweek == 4 && r.window == WindowKind::Form));
    assert!(ratings_as_of(&log, 1, WindowKind::Season).is_empty());
}
