use std::collections::BTreeSet;

use tracing::info;

use crate::fixtures::Fixture;
use crate::fpl_live::FplLiveRecord;
use crate::mapping::{PlayerMapping, Team, TeamMapping};
use crate::odm::Rating;
use crate::player_matches::{PlayerMatchRecord, sort_player_matches};
use crate::schedule::ScheduledFixture;
use crate::store::{Record, StoreError, TableStore};

/// Everything persisted for one season, loaded whole.
///
/// Changes are staged in memory; nothing reaches the store until
/// [`commit`](Self::commit). The team table is seeded by hand and only read.
#[derive(Debug, Clone, Default)]
pub struct SeasonState {
    pub teams: TeamMapping,
    pub fixtures: Vec<Fixture>,
    pub player_matches: Vec<PlayerMatchRecord>,
    pub ratings: Vec<Rating>,
    pub player_mapping: Vec<PlayerMapping>,
    pub schedule: Vec<ScheduledFixture>,
    pub fpl_live: Vec<FplLiveRecord>,
    dirty: BTreeSet<&'static str>,
}

impl SeasonState {
    pub fn load<S: TableStore>(store: &S) -> Result<Self, StoreError> {
        let state = Self {
            teams: TeamMapping::new(store.load::<Team>()?),
            fixtures: store.load()?,
            player_matches: store.load()?,
            ratings: store.load()?,
            player_mapping: store.load()?,
            schedule: store.load()?,
            fpl_live: store.load()?,
            dirty: BTreeSet::new(),
        };
        info!(
            teams = state.teams.teams().len(),
            fixtures = state.fixtures.len(),
            player_rows = state.player_matches.len(),
            ratings = state.ratings.len(),
            mapped_players = state.player_mapping.len(),
            "season state loaded"
        );
        Ok(state)
    }

    pub fn append_fixtures(&mut self, rows: Vec<Fixture>) -> usize {
        self.append(rows, |s| &mut s.fixtures)
    }

    pub fn append_ratings(&mut self, rows: Vec<Rating>) -> usize {
        self.append(rows, |s| &mut s.ratings)
    }

    /// Appends and restores the `(gameweek, team_id)` order.
    pub fn append_player_matches(&mut self, rows: Vec<PlayerMatchRecord>) -> usize {
        let added = self.append(rows, |s| &mut s.player_matches);
        if added > 0 {
            sort_player_matches(&mut self.player_matches);
        }
        added
    }

    pub fn append_fpl_live(&mut self, rows: Vec<FplLiveRecord>) -> usize {
        self.append(rows, |s| &mut s.fpl_live)
    }

    pub fn replace_player_mapping(&mut self, rows: Vec<PlayerMapping>) {
        if rows != self.player_mapping {
            self.player_mapping = rows;
            self.dirty.insert(PlayerMapping::TABLE);
        }
    }

    pub fn replace_schedule(&mut self, rows: Vec<ScheduledFixture>) {
        if rows != self.schedule {
            self.schedule = rows;
            self.dirty.insert(ScheduledFixture::TABLE);
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Rewrite every changed table, returning the table names written.
    pub fn commit<S: TableStore>(&mut self, store: &mut S) -> Result<Vec<&'static str>, StoreError> {
        let mut written = Vec::new();
        for table in std::mem::take(&mut self.dirty) {
            match table {
                Fixture::TABLE => store.save(&self.fixtures)?,
                PlayerMatchRecord::TABLE => store.save(&self.player_matches)?,
                Rating::TABLE => store.save(&self.ratings)?,
                PlayerMapping::TABLE => store.save(&self.player_mapping)?,
                ScheduledFixture::TABLE => store.save(&self.schedule)?,
                FplLiveRecord::TABLE => store.save(&self.fpl_live)?,
                _ => continue,
            }
            written.push(table);
        }
        if !written.is_empty() {
            info!(tables = ?written, "season state committed");
        }
        Ok(written)
    }

    fn append<R: Record>(
        &mut self,
        rows: Vec<R>,
        table: impl FnOnce(&mut Self) -> &mut Vec<R>,
    ) -> usize {
        let added = rows.len();
        if added > 0 {
            table(self).extend(rows);
            self.dirty.insert(R::TABLE);
        }
        added
    }
}
