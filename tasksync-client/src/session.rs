use std::sync::Arc;

use tasksync_core::{
    errors::{SyncError, ValidationError},
    events::{RawChange, Table},
    models::{Group, Task},
};

use crate::remote::{AuthProvider, RemoteStore, Subscription};
use crate::sync_engine::SyncEngine;

/// One signed-in viewing session: a loaded engine plus one push subscription
/// per table, held for the session's lifetime and released when it is dropped.
///
/// Everything runs on one logical thread. User mutations go through
/// [`Session::engine`]; push events are pumped through [`Session::next_change`].
/// The two interleave only at await points, in whatever order their I/O
/// completes, which is exactly the ordering the backend provides.
pub struct Session<R: RemoteStore> {
    engine: SyncEngine<R>,
    task_events: Subscription,
    group_events: Subscription,
    tasks_open: bool,
    groups_open: bool,
}

impl<R: RemoteStore> Session<R> {
    /// Load the signed-in user's records and open both push channels. Fails
    /// without touching the remote when no user is signed in.
    pub async fn start(remote: Arc<R>, auth: &dyn AuthProvider) -> Result<Self, SyncError> {
        let owner = auth.current_user().ok_or(ValidationError::NotSignedIn)?;

        let mut engine = SyncEngine::new(remote.clone(), owner);
        engine.load().await?;

        let task_events = remote.subscribe(Table::Tasks, owner).await?;
        let group_events = remote.subscribe(Table::Groups, owner).await?;
        tracing::info!(%owner, "session started");

        Ok(Session {
            engine,
            task_events,
            group_events,
            tasks_open: true,
            groups_open: true,
        })
    }

    pub fn engine(&mut self) -> &mut SyncEngine<R> {
        &mut self.engine
    }

    pub fn engine_ref(&self) -> &SyncEngine<R> {
        &self.engine
    }

    /// Await the next push event from either channel, reconcile it, and say
    /// which table changed. Malformed payloads are dropped with a warning.
    /// Resolves to `None` only once both channels have closed.
    pub async fn next_change(&mut self) -> Option<Table> {
        loop {
            tokio::select! {
                raw = self.task_events.recv(), if self.tasks_open => {
                    match raw {
                        Some(raw) => {
                            if let Some(table) = self.apply(raw) {
                                return Some(table);
                            }
                        }
                        None => self.tasks_open = false,
                    }
                }
                raw = self.group_events.recv(), if self.groups_open => {
                    match raw {
                        Some(raw) => {
                            if let Some(table) = self.apply(raw) {
                                return Some(table);
                            }
                        }
                        None => self.groups_open = false,
                    }
                }
                else => return None,
            }
        }
    }

    /// Drop the session, releasing both subscriptions.
    pub fn close(self) {
        tracing::info!(owner = %self.engine_ref().owner_id(), "session closed");
    }

    /// Validate an untyped payload at the boundary and hand the typed event
    /// to the engine. Returns the affected table, or `None` for a dropped
    /// malformed event.
    fn apply(&mut self, raw: RawChange) -> Option<Table> {
        let table = raw.table;
        match table {
            Table::Tasks => match raw.decode::<Task>() {
                Ok(event) => self.engine.reconcile_task(event),
                Err(e) => {
                    tracing::warn!(error = %e, "dropped malformed task event");
                    return None;
                }
            },
            Table::Groups => match raw.decode::<Group>() {
                Ok(event) => self.engine.reconcile_group(event),
                Err(e) => {
                    tracing::warn!(error = %e, "dropped malformed group event");
                    return None;
                }
            },
        }
        Some(table)
    }
}
