use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use fplalytics::aggregates::team_rollups;
use fplalytics::config::PipelineConfig;
use fplalytics::fpl::FplClient;
use fplalytics::http_cache::HttpFetcher;
use fplalytics::http_client::http_client;
use fplalytics::logging::init_logging;
use fplalytics::odm::{WindowKind, ratings_as_of};
use fplalytics::season::SeasonState;
use fplalytics::store::CsvStore;
use fplalytics::ticker::fixture_ticker;
use fplalytics::understat::UnderstatClient;
use fplalytics::update::{
    Sources, advance_to_gameweek, build_season_schedule, record_live_gameweek, refresh_mapping,
};

#[derive(Debug, Parser)]
#[command(name = "fplalytics", about = "Season reconciliation and team ratings")]
struct Cli {
    /// Season start year, e.g. 2023.
    #[arg(long, global = true, env = "FPLALYTICS_SEASON")]
    season: Option<String>,

    /// Root directory holding one folder of CSV tables per season.
    #[arg(long, global = true, env = "FPLALYTICS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile a completed gameweek and rate teams for the next one.
    Advance {
        #[arg(long)]
        gameweek: u32,
    },
    /// Rebuild the season calendar.
    Schedule,
    /// Refresh the player mapping from the fantasy game.
    RefreshMapping,
    /// Record the fantasy game's live statistics for a gameweek.
    FplLive {
        #[arg(long)]
        gameweek: u32,
    },
    /// Print the ratings in force for a gameweek (latest by default).
    Ratings {
        #[arg(long)]
        gameweek: Option<u32>,
        #[arg(long, value_enum, default_value_t = WindowArg::Season)]
        window: WindowArg,
    },
    /// Print fixture difficulty for a range of gameweeks.
    Ticker {
        #[arg(long)]
        from: u32,
        #[arg(long)]
        to: u32,
        #[arg(long, value_enum, default_value_t = WindowArg::Season)]
        window: WindowArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Season,
    Form,
}

impl From<WindowArg> for WindowKind {
    fn from(value: WindowArg) -> Self {
        match value {
            WindowArg::Season => WindowKind::Season,
            WindowArg::Form => WindowKind::Form,
        }
    }
}

fn main() -> Result<()> {
    let mut config = PipelineConfig::from_env();
    let cli = Cli::parse();
    if let Some(season) = cli.season {
        config.season = season;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    init_logging(&config)?;
    debug!(?config, "configuration resolved");

    let mut store = CsvStore::for_season(&config.data_dir, &config.season);
    match cli.command {
        Command::Advance { gameweek } => run_advance(&config, &mut store, gameweek),
        Command::Schedule => {
            let understat = UnderstatClient::new(fetcher(&config)?, &config.understat_base_url);
            let count = build_season_schedule(&mut store, &understat, &config.season)
                .context("schedule build failed")?;
            println!("Schedule rebuilt");
            println!("Dir: {}", store.dir().display());
            println!("Fixtures scheduled: {count}");
            Ok(())
        }
        Command::RefreshMapping => {
            let fpl = FplClient::new(fetcher(&config)?, &config.fpl_base_url);
            let report = refresh_mapping(&mut store, &fpl).context("mapping refresh failed")?;
            println!("Player mapping refreshed");
            print_unmapped(&report.unmapped);
            Ok(())
        }
        Command::FplLive { gameweek } => {
            let fpl = FplClient::new(fetcher(&config)?, &config.fpl_base_url);
            let added = record_live_gameweek(&mut store, &fpl, gameweek)
                .with_context(|| format!("live gameweek {gameweek} failed"))?;
            println!("Gameweek {gameweek} live data recorded");
            println!("Rows added: {added}");
            Ok(())
        }
        Command::Ratings { gameweek, window } => print_ratings(&store, gameweek, window.into()),
        Command::Ticker { from, to, window } => {
            print_ticker(&store, &config, from, to, window.into())
        }
    }
}

fn fetcher(config: &PipelineConfig) -> Result<Arc<HttpFetcher>> {
    let client = http_client(config.http_timeout_secs)?;
    Ok(Arc::new(HttpFetcher::with_default_cache(client)))
}

fn run_advance(config: &PipelineConfig, store: &mut CsvStore, gameweek: u32) -> Result<()> {
    let http = fetcher(config)?;
    let understat = UnderstatClient::new(Arc::clone(&http), &config.understat_base_url);
    let fpl = FplClient::new(http, &config.fpl_base_url);
    let sources = Sources {
        matches: &understat,
        players: &fpl,
    };
    let summary = advance_to_gameweek(store, sources, &config.season, gameweek, &config.odm)
        .with_context(|| format!("update cycle for gameweek {gameweek} failed"))?;

    println!("Gameweek {} reconciled", summary.completed_gameweek);
    println!("Season: {}", summary.season);
    println!("Dir: {}", store.dir().display());
    println!("Fixtures added: {}", summary.fixtures_added);
    println!("Ratings added: {}", summary.ratings_added);
    println!("Player rows added: {}", summary.player_rows_added);
    println!("Mapped players: {}", summary.mapped_players);
    if summary.tables_written.is_empty() {
        println!("Tables written: none");
    } else {
        println!("Tables written: {}", summary.tables_written.join(", "));
    }
    print_unmapped(&summary.report.unmapped);
    Ok(())
}

fn print_unmapped(unmapped: &[fplalytics::mapping::UnmappedPlayer]) {
    if unmapped.is_empty() {
        return;
    }
    println!("Unmapped players: {}", unmapped.len());
    for p in unmapped.iter().take(8) {
        println!(" - {} {} ({}) activity {}", p.source, p.external_id, p.name, p.activity);
    }
}

fn print_ratings(store: &CsvStore, gameweek: Option<u32>, window: WindowKind) -> Result<()> {
    let state = SeasonState::load(store).context("failed to load season tables")?;
    let gameweek = gameweek
        .or_else(|| state.ratings.iter().map(|r| r.gameweek).max())
        .context("no ratings recorded yet")?;
    let rows = ratings_as_of(&state.ratings, gameweek, window);
    if rows.is_empty() {
        println!("No {window} ratings at or before gameweek {gameweek}");
        return Ok(());
    }
    let rollups = team_rollups(&state.fixtures, 1, gameweek.saturating_sub(1));

    println!("{window} ratings for gameweek {}", rows[0].gameweek);
    println!("{:<24} {:>8} {:>8} {:>8}", "Team", "O", "D", "xGD");
    let mut ordered = rows;
    ordered.sort_by(|a, b| (b.o_rating / b.d_rating).total_cmp(&(a.o_rating / a.d_rating)));
    for r in ordered {
        let xgd = rollups
            .get(r.team_id as usize)
            .map(|t| t.xg_difference())
            .unwrap_or(0.0);
        println!(
            "{:<24} {:>8.3} {:>8.3} {:>8.2}",
            r.team, r.o_rating, r.d_rating, xgd
        );
    }
    Ok(())
}

fn print_ticker(
    store: &CsvStore,
    config: &PipelineConfig,
    from: u32,
    to: u32,
    window: WindowKind,
) -> Result<()> {
    anyhow::ensure!(from <= to, "--from must not exceed --to");
    let state = SeasonState::load(store).context("failed to load season tables")?;
    let mut rows = fixture_ticker(
        &state.schedule,
        &state.teams,
        &state.ratings,
        window,
        from,
        to,
        config.home_advantage,
    )?;
    rows.sort_by(|a, b| b.attack_rating.total_cmp(&a.attack_rating));

    println!("Fixture ticker GW{from}-GW{to} ({window})");
    for row in rows {
        let fixtures = row
            .fixtures
            .values()
            .map(|games| {
                if games.is_empty() {
                    "-".to_string()
                } else {
                    games
                        .iter()
                        .map(|g| g.label.as_str())
                        .collect::<Vec<_>>()
                        .join("+")
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{:<24} att {:>6.1} def {:>6.1}  {fixtures}",
            row.team, row.attack_rating, row.defence_rating
        );
    }
    Ok(())
}
