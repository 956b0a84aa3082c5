use std::collections::HashMap;

use tasksync_core::models::{Group, Task};
use tokio::sync::watch;
use uuid::Uuid;

pub trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for Task {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Group {
    fn key(&self) -> Uuid {
        self.id
    }
}

/// Authoritative in-memory collection for one record type, keyed by id.
///
/// Every successful mutation bumps a revision counter observable through
/// [`EntityStore::watch`]; the view layer re-derives its projections when the
/// counter moves. Replacement on upsert is wholesale, never a partial merge,
/// since reconciliation always supplies a complete record.
pub struct EntityStore<R: Keyed> {
    records: HashMap<Uuid, R>,
    revision: watch::Sender<u64>,
}

impl<R: Keyed> EntityStore<R> {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        EntityStore {
            records: HashMap::new(),
            revision,
        }
    }

    /// Insert, or replace the existing record with the same id wholesale.
    pub fn upsert(&mut self, record: R) {
        self.records.insert(record.key(), record);
        self.bump();
    }

    /// Remove a record if present. Absent ids are a no-op, never an error:
    /// a local removal may be followed by a duplicate push-channel delete.
    pub fn remove(&mut self, id: Uuid) -> Option<R> {
        let removed = self.records.remove(&id);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Swap a placeholder id for the canonical record in one step, with a
    /// single change notification. The store never holds both.
    pub fn replace(&mut self, old_id: Uuid, record: R) {
        self.records.remove(&old_id);
        self.records.insert(record.key(), record);
        self.bump();
    }

    pub fn get(&self, id: Uuid) -> Option<&R> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.contains_key(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&mut self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

impl<R: Keyed> Default for EntityStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
