use async_trait::async_trait;
use tasksync_core::{
    errors::RemoteError,
    events::{RawChange, Table},
    models::{Group, Task, TaskPatch},
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// The hosted backend, as far as this engine is concerned: CRUD over two
/// record types scoped by owner, plus a push channel per table. The transport
/// behind it is opaque and treated as an unreliable, at-least-once channel.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select_tasks(&self, owner: Uuid) -> Result<Vec<Task>, RemoteError>;
    async fn select_groups(&self, owner: Uuid) -> Result<Vec<Group>, RemoteError>;

    /// Persist a new task. The returned record is canonical: the remote store
    /// assigns the permanent id and timestamps.
    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError>;
    async fn insert_group(&self, group: &Group) -> Result<Group, RemoteError>;

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<(), RemoteError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), RemoteError>;

    /// Open the change-event stream for one table, filtered to the owner.
    async fn subscribe(&self, table: Table, owner: Uuid) -> Result<Subscription, RemoteError>;
}

/// Identity collaborator. The engine runs no queries until a user is present.
pub trait AuthProvider {
    fn current_user(&self) -> Option<Uuid>;
}

/// Owned handle on one table's push channel.
///
/// Dropping the handle runs the release hook exactly once, so the channel is
/// torn down on every exit path and no events are delivered afterwards.
pub struct Subscription {
    table: Table,
    events: mpsc::Receiver<RawChange>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(
        table: Table,
        events: mpsc::Receiver<RawChange>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Subscription {
            table,
            events,
            _guard: SubscriptionGuard {
                table,
                release: Some(Box::new(release)),
            },
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Next raw change event, in delivery order. `None` once the channel is
    /// closed on the remote side.
    pub async fn recv(&mut self) -> Option<RawChange> {
        self.events.recv().await
    }
}

struct SubscriptionGuard {
    table: Table,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(table = %self.table, "push subscription released");
            release();
        }
    }
}
