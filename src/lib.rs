pub mod aggregates;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod fpl;
pub mod fpl_live;
pub mod http_cache;
pub mod http_client;
pub mod logging;
pub mod mapping;
pub mod odm;
pub mod player_matches;
pub mod schedule;
pub mod season;
pub mod sources;
pub mod store;
pub mod ticker;
pub mod understat;
pub mod update;
