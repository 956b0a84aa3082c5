#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tasksync_client::remote::{AuthProvider, RemoteStore, Subscription};
use tasksync_core::errors::RemoteError;
use tasksync_core::events::{ChangeKind, RawChange, Table};
use tasksync_core::models::{Group, Task, TaskPatch};
use tokio::sync::mpsc;
use uuid::Uuid;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct FakeAuth(pub Option<Uuid>);

impl AuthProvider for FakeAuth {
    fn current_user(&self) -> Option<Uuid> {
        self.0
    }
}

#[derive(Default)]
struct FakeState {
    tasks: HashMap<Uuid, Task>,
    groups: HashMap<Uuid, Group>,
    fail_inserts: bool,
    fail_updates: bool,
    fail_deletes: bool,
    patches: Vec<(Uuid, TaskPatch)>,
    insert_calls: usize,
    task_tx: Option<mpsc::Sender<RawChange>>,
    group_tx: Option<mpsc::Sender<RawChange>>,
}

/// In-process stand-in for the hosted backend: scripted failures, call
/// recording, and a push channel the test can feed events into.
pub struct FakeRemote {
    state: Mutex<FakeState>,
    active_subscriptions: Arc<AtomicUsize>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeRemote {
            state: Mutex::new(FakeState::default()),
            active_subscriptions: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn seed_group(&self, group: Group) {
        self.state.lock().unwrap().groups.insert(group.id, group);
    }

    pub fn seed_task(&self, task: Task) {
        self.state.lock().unwrap().tasks.insert(task.id, task);
    }

    pub fn fail_inserts(&self, on: bool) {
        self.state.lock().unwrap().fail_inserts = on;
    }

    pub fn fail_updates(&self, on: bool) {
        self.state.lock().unwrap().fail_updates = on;
    }

    pub fn fail_deletes(&self, on: bool) {
        self.state.lock().unwrap().fail_deletes = on;
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn recorded_patches(&self) -> Vec<(Uuid, TaskPatch)> {
        self.state.lock().unwrap().patches.clone()
    }

    pub fn task_record(&self, id: Uuid) -> Option<Task> {
        self.state.lock().unwrap().tasks.get(&id).cloned()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active_subscriptions.load(Ordering::SeqCst)
    }

    /// Drop both push senders, closing the subscribers' channels.
    pub fn close_channels(&self) {
        let mut state = self.state.lock().unwrap();
        state.task_tx = None;
        state.group_tx = None;
    }

    /// Deliver a push event to the matching subscriber.
    pub async fn push(&self, raw: RawChange) {
        let tx = {
            let state = self.state.lock().unwrap();
            match raw.table {
                Table::Tasks => state.task_tx.clone(),
                Table::Groups => state.group_tx.clone(),
            }
        };
        tx.expect("no subscriber for table")
            .send(raw)
            .await
            .expect("subscriber channel closed");
    }
}

pub fn task_insert_event(task: &Task) -> RawChange {
    RawChange {
        table: Table::Tasks,
        kind: ChangeKind::Insert,
        record: Some(serde_json::to_value(task).unwrap()),
        id: None,
    }
}

pub fn task_update_event(task: &Task) -> RawChange {
    RawChange {
        table: Table::Tasks,
        kind: ChangeKind::Update,
        record: Some(serde_json::to_value(task).unwrap()),
        id: None,
    }
}

pub fn task_delete_event(id: Uuid) -> RawChange {
    RawChange {
        table: Table::Tasks,
        kind: ChangeKind::Delete,
        record: None,
        id: Some(id),
    }
}

pub fn group_insert_event(group: &Group) -> RawChange {
    RawChange {
        table: Table::Groups,
        kind: ChangeKind::Insert,
        record: Some(serde_json::to_value(group).unwrap()),
        id: None,
    }
}

pub fn group(owner: Uuid, name: &str, is_default: bool) -> Group {
    Group {
        id: Uuid::new_v4(),
        owner_id: owner,
        name: name.into(),
        is_default,
        color: None,
    }
}

pub fn task(owner: Uuid, group_id: Uuid, text: &str, created_at: DateTime<Utc>) -> Task {
    Task {
        id: Uuid::new_v4(),
        owner_id: owner,
        text: text.into(),
        completed: false,
        completed_at: None,
        priority: false,
        deadline: None,
        group_id,
        archived: false,
        created_at,
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn select_tasks(&self, owner: Uuid) -> Result<Vec<Task>, RemoteError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .values()
            .filter(|t| t.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn select_groups(&self, owner: Uuid) -> Result<Vec<Group>, RemoteError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .values()
            .filter(|g| g.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if state.fail_inserts {
            return Err(RemoteError::Network("injected insert failure".into()));
        }
        // The store assigns the permanent id.
        let mut canonical = task.clone();
        canonical.id = Uuid::new_v4();
        state.tasks.insert(canonical.id, canonical.clone());
        Ok(canonical)
    }

    async fn insert_group(&self, group: &Group) -> Result<Group, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if state.fail_inserts {
            return Err(RemoteError::Network("injected insert failure".into()));
        }
        let mut canonical = group.clone();
        canonical.id = Uuid::new_v4();
        state.groups.insert(canonical.id, canonical.clone());
        Ok(canonical)
    }

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_updates {
            return Err(RemoteError::Rejected("injected update failure".into()));
        }
        if !state.tasks.contains_key(&id) {
            return Err(RemoteError::Rejected(format!("no such task {id}")));
        }
        state.patches.push((id, patch.clone()));
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(RemoteError::Network("injected delete failure".into()));
        }
        state.tasks.remove(&id);
        Ok(())
    }

    async fn subscribe(&self, table: Table, _owner: Uuid) -> Result<Subscription, RemoteError> {
        let (tx, rx) = mpsc::channel(32);
        {
            let mut state = self.state.lock().unwrap();
            match table {
                Table::Tasks => state.task_tx = Some(tx),
                Table::Groups => state.group_tx = Some(tx),
            }
        }
        self.active_subscriptions.fetch_add(1, Ordering::SeqCst);
        let active = self.active_subscriptions.clone();
        Ok(Subscription::new(table, rx, move || {
            active.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}
