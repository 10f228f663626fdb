use thiserror::Error;

use crate::mapping::Source;
use crate::odm::WindowKind;
use crate::store::StoreError;

/// Failures that abort a reconciliation step or a whole update cycle.
///
/// Missing player mappings are not errors: they are recovered locally
/// and reported through [`crate::mapping::MappingReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fixture {fixture_id}: {feed} team id {external_id} is not in the team mapping")]
    UnresolvedTeam {
        fixture_id: u64,
        feed: Source,
        external_id: u32,
    },

    #[error("team mapping incomplete: {reason}")]
    IncompleteTeamMapping { reason: String },

    #[error("source fetch failed during {step}: {message}")]
    SourceFetch { step: &'static str, message: String },

    #[error("fixture {fixture_id} is resulted but has no xG values")]
    MissingExpectedGoals { fixture_id: u64 },

    #[error("no {window} ratings stamped at or before gameweek {gameweek}")]
    MissingRatings { window: WindowKind, gameweek: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub(crate) fn fetch(step: &'static str, err: anyhow::Error) -> Self {
        Self::SourceFetch {
            step,
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
