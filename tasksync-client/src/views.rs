use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tasksync_core::models::Task;
use uuid::Uuid;

/// Transient UI selections, passed in explicitly on every derivation rather
/// than captured as ambient state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub group: Option<Uuid>,
}

impl TaskFilter {
    pub fn group(id: Uuid) -> Self {
        TaskFilter { group: Some(id) }
    }

    fn admits(&self, task: &Task) -> bool {
        self.group.map_or(true, |g| task.group_id == g)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    DueToday,
    Upcoming,
}

/// Classify a deadline against the current instant. Checked in order: anything
/// strictly in the past is overdue, even if it is still today's date.
pub fn classify_deadline(deadline: DateTime<Utc>, now: DateTime<Local>) -> Urgency {
    if deadline < now.with_timezone(&Utc) {
        Urgency::Overdue
    } else if deadline.with_timezone(&Local).date_naive() == now.date_naive() {
        Urgency::DueToday
    } else {
        Urgency::Upcoming
    }
}

/// The derived read views the presentation layer renders. Recomputed from the
/// full store contents on every change; nothing here is cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskViews {
    /// Not archived, not completed. Priority first, then newest created.
    pub active: Vec<Task>,
    /// Not archived, completed on the current local calendar day.
    pub completed_today: Vec<Task>,
    /// Archived, regardless of completion state.
    pub archived: Vec<Task>,
    /// Archived-task count per local creation day, for the activity heatmap.
    /// Always derived from the full archived set, ignoring the group filter.
    pub activity: BTreeMap<NaiveDate, usize>,
}

pub fn project<'a, I>(tasks: I, filter: &TaskFilter, now: DateTime<Local>) -> TaskViews
where
    I: IntoIterator<Item = &'a Task>,
{
    let today = now.date_naive();
    let mut views = TaskViews::default();

    for task in tasks {
        if task.archived {
            *views
                .activity
                .entry(task.created_at.with_timezone(&Local).date_naive())
                .or_insert(0) += 1;
            if filter.admits(task) {
                views.archived.push(task.clone());
            }
            continue;
        }
        if !filter.admits(task) {
            continue;
        }
        if !task.completed {
            views.active.push(task.clone());
        } else if completed_on(task, today) {
            views.completed_today.push(task.clone());
        }
        // Completed before today and not yet archived: shown nowhere.
    }

    display_sort(&mut views.active);
    display_sort(&mut views.completed_today);
    display_sort(&mut views.archived);
    views
}

fn completed_on(task: &Task, day: NaiveDate) -> bool {
    task.completed_at
        .map_or(false, |at| at.with_timezone(&Local).date_naive() == day)
}

fn display_sort(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.created_at.cmp(&a.created_at))
    });
}
