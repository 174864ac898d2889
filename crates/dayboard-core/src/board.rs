use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::datastore::{KvStore, PersistenceBridge};
use crate::error::BoardError;
use crate::id::{IdGenerator, TaskId};
use crate::reorder::{self, Edge};
use crate::store::{Snapshot, TaskDraft, TaskPatch};
use crate::task::{Section, Task};
use crate::view::{self, SectionStats, ViewQuery};

/// The live board: the current snapshot plus the bridge it is saved through.
/// Each mutation swaps in a whole new snapshot and then writes it out.
#[derive(Debug)]
pub struct Board<S> {
    snapshot: Snapshot,
    bridge: PersistenceBridge<S>,
    ids: IdGenerator,
}

impl<S: KvStore> Board<S> {
    #[tracing::instrument(skip(bridge))]
    pub fn open(bridge: PersistenceBridge<S>) -> Self {
        let snapshot = bridge.load();
        info!(count = snapshot.len(), key = bridge.key(), "board opened");
        Self {
            snapshot,
            bridge,
            ids: IdGenerator::new(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.snapshot.get(id)
    }

    pub fn bridge(&self) -> &PersistenceBridge<S> {
        &self.bridge
    }

    #[tracing::instrument(skip(self, draft), fields(section = ?draft.section))]
    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<TaskId, BoardError> {
        let (next, id) = self.snapshot.create(draft, &mut self.ids, now)?;
        self.commit(next);
        Ok(id)
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<(), BoardError> {
        let next = self.snapshot.update(id, patch)?;
        self.commit(next);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_done(&mut self, id: &TaskId) -> Result<bool, BoardError> {
        let next = self.snapshot.toggle_done(id)?;
        let done = next.get(id).is_some_and(|task| task.done);
        self.commit(next);
        Ok(done)
    }

    /// Returns whether a task was removed.
    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: &TaskId) -> bool {
        let next = self.snapshot.delete(id);
        let removed = next.len() < self.snapshot.len();
        if removed {
            self.commit(next);
        }
        removed
    }

    /// Empties the board. Asking the user first is the caller's job.
    #[tracing::instrument(skip(self))]
    pub fn clear_all(&mut self) -> usize {
        let removed = self.snapshot.len();
        let next = self.snapshot.clear_all();
        self.commit(next);
        removed
    }

    #[tracing::instrument(skip(self))]
    pub fn reset_all_done(&mut self) {
        let next = self.snapshot.reset_all_done();
        self.commit(next);
    }

    /// Returns whether anything moved.
    #[tracing::instrument(skip(self))]
    pub fn reorder(&mut self, moved: &TaskId, target: &TaskId) -> bool {
        let next = reorder::reorder(&self.snapshot, moved, target);
        self.commit_if_changed(next)
    }

    #[tracing::instrument(skip(self))]
    pub fn move_to_edge(&mut self, id: &TaskId, edge: Edge) -> bool {
        let next = reorder::move_to_edge(&self.snapshot, id, edge);
        self.commit_if_changed(next)
    }

    pub fn categories(&self) -> Vec<String> {
        view::categories(&self.snapshot)
    }

    pub fn filtered(&self, query: &ViewQuery) -> Vec<Task> {
        view::filtered(&self.snapshot, query)
    }

    pub fn section_stats(&self, query: &ViewQuery) -> BTreeMap<Section, SectionStats> {
        view::section_stats(&self.filtered(query))
    }

    pub fn global_progress(&self, query: &ViewQuery) -> u8 {
        view::global_progress(&self.filtered(query))
    }

    fn commit_if_changed(&mut self, next: Snapshot) -> bool {
        if next == self.snapshot {
            return false;
        }
        self.commit(next);
        true
    }

    fn commit(&mut self, next: Snapshot) {
        self.snapshot = next;
        let saved = self.bridge.save(&self.snapshot);
        debug!(count = self.snapshot.len(), saved, "snapshot committed");
    }
}
