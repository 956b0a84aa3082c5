use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single task record, as held locally and as exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub group_id: Uuid,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Flip completion state. `completed` and `completed_at` always move together.
    pub fn toggled_completed(&self, now: DateTime<Utc>) -> Task {
        let completed = !self.completed;
        Task {
            completed,
            completed_at: completed.then_some(now),
            ..self.clone()
        }
    }

    pub fn toggled_priority(&self) -> Task {
        Task {
            priority: !self.priority,
            ..self.clone()
        }
    }

    pub fn toggled_archived(&self) -> Task {
        Task {
            archived: !self.archived,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub is_default: bool,
    /// Presentation-only; carried through untouched.
    pub color: Option<String>,
}

/// User input for a task that has not been persisted yet.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub priority: bool,
    pub deadline: Option<DateTime<Utc>>,
}

/// User input for a group that has not been persisted yet.
#[derive(Debug, Clone, Default)]
pub struct GroupDraft {
    pub name: String,
    pub is_default: bool,
    pub color: Option<String>,
}

/// Partial-update shape sent to the remote store. Only the fields a mutation
/// touches are present; everything else is omitted from the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl TaskPatch {
    pub fn completion(completed: bool, completed_at: Option<DateTime<Utc>>) -> Self {
        TaskPatch {
            completed: Some(completed),
            completed_at: Some(completed_at),
            ..TaskPatch::default()
        }
    }

    pub fn priority(priority: bool) -> Self {
        TaskPatch {
            priority: Some(priority),
            ..TaskPatch::default()
        }
    }

    pub fn archived(archived: bool) -> Self {
        TaskPatch {
            archived: Some(archived),
            ..TaskPatch::default()
        }
    }
}

/// Apply the default-time rule for relative-day deadlines: a deadline on
/// tomorrow's date with a zero time-of-day came from a date-only picker and is
/// stored as 09:00 local time that day. Every other value passes through.
pub fn normalize_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let local = deadline.with_timezone(&Local);
    let tomorrow = now.with_timezone(&Local).date_naive() + Duration::days(1);
    if local.date_naive() != tomorrow || local.time() != NaiveTime::MIN {
        return deadline;
    }
    let nine = match tomorrow.and_hms_opt(9, 0, 0) {
        Some(t) => t,
        None => return deadline,
    };
    match Local.from_local_datetime(&nine).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => deadline,
    }
}
