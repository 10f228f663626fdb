use std::path::PathBuf;

use crate::http_client::DEFAULT_TIMEOUT_SECS;
use crate::odm::OdmConfig;
use crate::ticker::DEFAULT_HOME_ADVANTAGE;
use crate::{fpl, understat};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_SEASON: &str = "2023";

/// Pipeline settings. Built from the environment; CLI flags override.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub season: String,
    pub odm: OdmConfig,
    pub home_advantage: f64,
    pub understat_base_url: String,
    pub fpl_base_url: String,
    pub http_timeout_secs: u64,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            season: DEFAULT_SEASON.to_string(),
            odm: OdmConfig::default(),
            home_advantage: DEFAULT_HOME_ADVANTAGE,
            understat_base_url: understat::DEFAULT_BASE_URL.to_string(),
            fpl_base_url: fpl::DEFAULT_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl PipelineConfig {
    /// Loads `.env.local` then `.env` (existing variables win), then reads the
    /// process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset, blank or unparsable values fall back to defaults; numeric
    /// values are clamped to a usable range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse = |key: &str| get(key).and_then(|v| v.trim().parse::<f64>().ok());

        let odm = OdmConfig {
            iterations: get("FPLALYTICS_ODM_ITERATIONS")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(d.odm.iterations)
                .max(1),
            epsilon: parse("FPLALYTICS_ODM_EPSILON")
                .filter(|v| *v > 0.0 && v.is_finite())
                .unwrap_or(d.odm.epsilon),
            scale: parse("FPLALYTICS_ODM_SCALE")
                .filter(|v| *v > 0.0 && v.is_finite())
                .unwrap_or(d.odm.scale),
            form_gameweeks: get("FPLALYTICS_FORM_GAMEWEEKS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(d.odm.form_gameweeks)
                .max(1),
        };

        Self {
            data_dir: get("FPLALYTICS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.data_dir),
            season: get("FPLALYTICS_SEASON")
                .map(|v| v.trim().to_string())
                .unwrap_or(d.season),
            odm,
            home_advantage: parse("FPLALYTICS_HOME_ADVANTAGE")
                .unwrap_or(d.home_advantage)
                .clamp(0.0, 1.0),
            understat_base_url: get("UNDERSTAT_BASE_URL").unwrap_or(d.understat_base_url),
            fpl_base_url: get("FPL_BASE_URL").unwrap_or(d.fpl_base_url),
            http_timeout_secs: get("FPLALYTICS_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(d.http_timeout_secs)
                .clamp(1, 300),
            log_level: get("FPLALYTICS_LOG_LEVEL").unwrap_or(d.log_level),
            log_json: get("FPLALYTICS_LOG_JSON")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(d.log_json),
        }
    }
}
