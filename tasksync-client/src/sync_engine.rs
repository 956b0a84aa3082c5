use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use tasksync_core::{
    errors::{SyncError, ValidationError},
    events::{ChangeEvent, MutationState},
    models::{normalize_deadline, Group, GroupDraft, Task, TaskDraft, TaskPatch},
};
use uuid::Uuid;

use crate::remote::RemoteStore;
use crate::store::EntityStore;
use crate::views::{project, TaskFilter, TaskViews};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    CreateTask,
    ToggleCompleted,
    TogglePriority,
    ToggleArchived,
    DeleteTask,
    CreateGroup,
}

/// One mutation attempt, tracked from optimistic apply until the remote call
/// settles it. A rolled-back entry stays terminal; only a fresh user action on
/// the same record replaces it.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub state: MutationState,
    pub started: Instant,
}

/// Orchestrates optimistic mutation against the entity stores, remote
/// persistence, and reconciliation of inbound push events.
///
/// Every mutation follows the same protocol: validate, compute the successor
/// record purely, apply it to the store, then await the remote call. That
/// await is the only suspension point, so apply-and-issue is atomic with
/// respect to other mutations and to reconciliation.
pub struct SyncEngine<R> {
    remote: Arc<R>,
    owner_id: Uuid,
    tasks: EntityStore<Task>,
    groups: EntityStore<Group>,
    mutations: HashMap<Uuid, PendingMutation>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: Arc<R>, owner_id: Uuid) -> Self {
        SyncEngine {
            remote,
            owner_id,
            tasks: EntityStore::new(),
            groups: EntityStore::new(),
            mutations: HashMap::new(),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn tasks(&self) -> &EntityStore<Task> {
        &self.tasks
    }

    pub fn groups(&self) -> &EntityStore<Group> {
        &self.groups
    }

    /// The owner's default group, used as the initial filter selection.
    pub fn default_group(&self) -> Option<&Group> {
        self.groups.all().find(|g| g.is_default)
    }

    pub fn views(&self, filter: &TaskFilter, now: DateTime<Local>) -> TaskViews {
        project(self.tasks.all(), filter, now)
    }

    /// Outcome of the most recent mutation touching this record, if any.
    pub fn mutation_state(&self, id: Uuid) -> Option<MutationState> {
        self.mutations.get(&id).map(|m| m.state)
    }

    /// Pull the owner's current server state into the stores. Groups first,
    /// so no task ever references a group the store has not seen.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        let groups = self.remote.select_groups(self.owner_id).await?;
        for group in groups {
            self.groups.upsert(group);
        }
        let tasks = self.remote.select_tasks(self.owner_id).await?;
        for task in tasks {
            self.tasks.upsert(task);
        }
        tracing::info!(
            owner = %self.owner_id,
            groups = self.groups.len(),
            tasks = self.tasks.len(),
            "initial load complete"
        );
        Ok(())
    }

    pub async fn create_task(
        &mut self,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Task, SyncError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyTaskText.into());
        }
        let group_id = draft.group_id.ok_or(ValidationError::MissingGroup)?;
        if !self.groups.contains(group_id) {
            // Never synthesize an orphaned group reference locally.
            return Err(ValidationError::UnknownGroup(group_id).into());
        }

        let placeholder = Task {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            text: text.to_string(),
            completed: false,
            completed_at: None,
            priority: draft.priority,
            deadline: draft.deadline.map(|d| normalize_deadline(d, now)),
            group_id,
            archived: false,
            created_at: now,
        };

        self.tasks.upsert(placeholder.clone());
        self.begin(placeholder.id, MutationKind::CreateTask);

        match self.remote.insert_task(&placeholder).await {
            Ok(canonical) => {
                self.tasks.replace(placeholder.id, canonical.clone());
                self.settle(placeholder.id, MutationState::Committed);
                tracing::debug!(
                    placeholder = %placeholder.id,
                    task = %canonical.id,
                    "task create committed"
                );
                Ok(canonical)
            }
            Err(e) => {
                self.tasks.remove(placeholder.id);
                self.settle(placeholder.id, MutationState::RolledBack);
                tracing::warn!(task = %placeholder.id, error = %e, "task create rolled back");
                Err(e.into())
            }
        }
    }

    /// Flip completion. `completed` and `completed_at` move together in one
    /// store write, both optimistically and on rollback.
    pub async fn toggle_completed(
        &mut self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Task, SyncError> {
        let before = self
            .tasks
            .get(id)
            .cloned()
            .ok_or(SyncError::UnknownRecord(id))?;
        let after = before.toggled_completed(now);
        let patch = TaskPatch::completion(after.completed, after.completed_at);
        self.push_update(before, after, patch, MutationKind::ToggleCompleted)
            .await
    }

    pub async fn toggle_priority(&mut self, id: Uuid) -> Result<Task, SyncError> {
        let before = self
            .tasks
            .get(id)
            .cloned()
            .ok_or(SyncError::UnknownRecord(id))?;
        let after = before.toggled_priority();
        let patch = TaskPatch::priority(after.priority);
        self.push_update(before, after, patch, MutationKind::TogglePriority)
            .await
    }

    pub async fn toggle_archived(&mut self, id: Uuid) -> Result<Task, SyncError> {
        let before = self
            .tasks
            .get(id)
            .cloned()
            .ok_or(SyncError::UnknownRecord(id))?;
        let after = before.toggled_archived();
        let patch = TaskPatch::archived(after.archived);
        self.push_update(before, after, patch, MutationKind::ToggleArchived)
            .await
    }

    /// Shared update protocol for the toggles: apply the successor record
    /// optimistically, send the partial update, and either keep it or restore
    /// the prior record wholesale.
    async fn push_update(
        &mut self,
        before: Task,
        after: Task,
        patch: TaskPatch,
        kind: MutationKind,
    ) -> Result<Task, SyncError> {
        let id = after.id;
        self.tasks.upsert(after.clone());
        self.begin(id, kind);

        match self.remote.update_task(id, &patch).await {
            Ok(()) => {
                self.settle(id, MutationState::Committed);
                tracing::debug!(task = %id, ?kind, "task update committed");
                Ok(after)
            }
            Err(e) => {
                self.tasks.upsert(before);
                self.settle(id, MutationState::RolledBack);
                tracing::warn!(task = %id, ?kind, error = %e, "task update rolled back");
                Err(e.into())
            }
        }
    }

    pub async fn delete_task(&mut self, id: Uuid) -> Result<(), SyncError> {
        let before = self
            .tasks
            .remove(id)
            .ok_or(SyncError::UnknownRecord(id))?;
        self.begin(id, MutationKind::DeleteTask);

        match self.remote.delete_task(id).await {
            Ok(()) => {
                self.settle(id, MutationState::Committed);
                tracing::debug!(task = %id, "task delete committed");
                Ok(())
            }
            Err(e) => {
                // Re-insert the removed record with every field intact.
                self.tasks.upsert(before);
                self.settle(id, MutationState::RolledBack);
                tracing::warn!(task = %id, error = %e, "task delete rolled back");
                Err(e.into())
            }
        }
    }

    pub async fn create_group(&mut self, draft: GroupDraft) -> Result<Group, SyncError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyGroupName.into());
        }
        if draft.is_default && self.groups.all().any(|g| g.is_default) {
            return Err(ValidationError::DuplicateDefaultGroup.into());
        }

        let placeholder = Group {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            name: name.to_string(),
            is_default: draft.is_default,
            color: draft.color,
        };

        self.groups.upsert(placeholder.clone());
        self.begin(placeholder.id, MutationKind::CreateGroup);

        match self.remote.insert_group(&placeholder).await {
            Ok(canonical) => {
                self.groups.replace(placeholder.id, canonical.clone());
                self.settle(placeholder.id, MutationState::Committed);
                Ok(canonical)
            }
            Err(e) => {
                self.groups.remove(placeholder.id);
                self.settle(placeholder.id, MutationState::RolledBack);
                tracing::warn!(group = %placeholder.id, error = %e, "group create rolled back");
                Err(e.into())
            }
        }
    }

    /// Apply one inbound task event, in arrival order. Insert and update are
    /// both a wholesale upsert: last write wins by delivery order, with no
    /// revision comparison. A stale echo can transiently overwrite an
    /// unconfirmed optimistic edit; the mutation's own commit path re-asserts
    /// the correct state.
    pub fn reconcile_task(&mut self, event: ChangeEvent<Task>) {
        match event {
            ChangeEvent::Insert(task) | ChangeEvent::Update(task) => {
                tracing::debug!(task = %task.id, "reconciled task record");
                self.tasks.upsert(task);
            }
            ChangeEvent::Delete(id) => {
                if self.tasks.remove(id).is_none() {
                    // Duplicate delivery of a delete we already applied.
                    tracing::debug!(task = %id, "delete event for absent task ignored");
                }
                self.mutations.remove(&id);
            }
        }
    }

    pub fn reconcile_group(&mut self, event: ChangeEvent<Group>) {
        match event {
            ChangeEvent::Insert(group) | ChangeEvent::Update(group) => {
                tracing::debug!(group = %group.id, "reconciled group record");
                self.groups.upsert(group);
            }
            ChangeEvent::Delete(id) => {
                if self.groups.remove(id).is_none() {
                    tracing::debug!(group = %id, "delete event for absent group ignored");
                }
                self.mutations.remove(&id);
            }
        }
    }

    fn begin(&mut self, id: Uuid, kind: MutationKind) {
        tracing::debug!(record = %id, ?kind, "mutation pending");
        self.mutations.insert(
            id,
            PendingMutation {
                kind,
                state: MutationState::Pending,
                started: Instant::now(),
            },
        );
    }

    fn settle(&mut self, id: Uuid, state: MutationState) {
        // Outcomes are only worth keeping for records still in a store; a
        // committed delete or a rolled-back create leaves nothing to annotate,
        // and a committed create lives on under its canonical id. Pruning here
        // keeps the table bounded by the live record count.
        if !self.tasks.contains(id) && !self.groups.contains(id) {
            self.mutations.remove(&id);
            return;
        }
        if let Some(m) = self.mutations.get_mut(&id) {
            m.state = state;
        }
    }
}
