use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::debug;

use crate::error::{BoardError, ValidationError};
use crate::id::{IdGenerator, TaskId};
use crate::task::{Section, Task, normalize_category, normalize_comment, normalize_title};
use crate::view::effective_order;

const SHORT_ID_LEN: usize = 8;

/// Input for [`Snapshot::create`].
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub section: Section,
    pub category: Option<String>,
    pub comment: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, section: Section) -> Self {
        Self {
            title: title.into(),
            section,
            category: None,
            comment: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Field changes for [`Snapshot::update`]. `None` leaves a field alone;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub section: Option<Section>,
    pub category: Option<Option<String>>,
    pub comment: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.section.is_none()
            && self.category.is_none()
            && self.comment.is_none()
    }
}

/// Immutable state of the task collection. Every mutator returns a new
/// snapshot and leaves `self` untouched. Slice order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tasks: Arc<[Task]>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: tasks.into(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Tasks whose id starts with `prefix`.
    pub fn matching_prefix(&self, prefix: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.id.as_str().starts_with(prefix))
            .collect()
    }

    pub fn section_tasks(&self, section: Section) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.section == section)
    }

    /// Shortest prefix of `id`, at least eight characters long, that no other
    /// task id starts with.
    pub fn short_id<'a>(&self, id: &'a TaskId) -> &'a str {
        let text = id.as_str();
        let ends = text
            .char_indices()
            .map(|(idx, _)| idx)
            .skip(SHORT_ID_LEN)
            .chain(std::iter::once(text.len()));
        for end in ends {
            let prefix = &text[..end];
            let clashes = self
                .tasks
                .iter()
                .any(|task| &task.id != id && task.id.as_str().starts_with(prefix));
            if !clashes {
                return prefix;
            }
        }
        text
    }

    pub fn create(
        &self,
        draft: TaskDraft,
        ids: &mut IdGenerator,
        now: DateTime<Utc>,
    ) -> Result<(Snapshot, TaskId), BoardError> {
        let title = normalize_title(&draft.title).ok_or(ValidationError::EmptyTitle)?;

        let (mut tasks, order) = self.next_order(draft.section);

        let id = ids.next_id();
        let mut task = Task::new(id.clone(), title, draft.section, self.stamp(now));
        task.category = draft.category.as_deref().and_then(normalize_category);
        task.comment = draft.comment.as_deref().and_then(normalize_comment);
        task.order = Some(order);

        debug!(id = %task.id, section = ?task.section, order, "task created");

        tasks.push(task);
        Ok((Self::from_tasks(tasks), id))
    }

    /// Applies every field of `patch` or none of them.
    pub fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Snapshot, BoardError> {
        let idx = self.index_of(id)?;

        let title = match patch.title.as_deref() {
            Some(raw) => Some(normalize_title(raw).ok_or(ValidationError::EmptyTitle)?),
            None => None,
        };

        let mut task = self.tasks[idx].clone();
        if let Some(title) = title {
            task.title = title;
        }
        // Order is kept across sections and renumbered on the next reorder.
        if let Some(section) = patch.section {
            task.section = section;
        }
        if let Some(category) = patch.category {
            task.category = category.as_deref().and_then(normalize_category);
        }
        if let Some(comment) = patch.comment {
            task.comment = comment.as_deref().and_then(normalize_comment);
        }

        debug!(id = %task.id, "task updated");
        Ok(self.replace_at(idx, task))
    }

    pub fn toggle_done(&self, id: &TaskId) -> Result<Snapshot, BoardError> {
        let idx = self.index_of(id)?;
        let mut task = self.tasks[idx].clone();
        task.done = !task.done;
        debug!(id = %task.id, done = task.done, "task toggled");
        Ok(self.replace_at(idx, task))
    }

    /// Removes the task. Unknown ids leave the snapshot as it is.
    pub fn delete(&self, id: &TaskId) -> Snapshot {
        if !self.contains(id) {
            debug!(id = %id, "delete of unknown task ignored");
            return self.clone();
        }
        let tasks = self
            .tasks
            .iter()
            .filter(|task| &task.id != id)
            .cloned()
            .collect();
        Self::from_tasks(tasks)
    }

    pub fn clear_all(&self) -> Snapshot {
        Self::empty()
    }

    pub fn reset_all_done(&self) -> Snapshot {
        let tasks = self
            .tasks
            .iter()
            .cloned()
            .map(|mut task| {
                task.done = false;
                task
            })
            .collect();
        Self::from_tasks(tasks)
    }

    pub(crate) fn replace_at(&self, idx: usize, task: Task) -> Snapshot {
        let mut tasks = self.tasks.to_vec();
        tasks[idx] = task;
        Self::from_tasks(tasks)
    }

    /// Slot after the last ordered task of `section`. When that would pass
    /// `i64::MAX` the section is renumbered `0..k` first.
    fn next_order(&self, section: Section) -> (Vec<Task>, i64) {
        let tasks = self.tasks.to_vec();
        let max = self.section_tasks(section).filter_map(|task| task.order).max();
        match max {
            None => (tasks, 0),
            Some(max) => match max.checked_add(1) {
                Some(next) => (tasks, next),
                None => renumber_section(tasks, section),
            },
        }
    }

    fn index_of(&self, id: &TaskId) -> Result<usize, BoardError> {
        self.tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| BoardError::NotFound(id.clone()))
    }

    /// Creation stamps are whole milliseconds and strictly increase, so
    /// newest-first is never a tie. At the last representable instant the
    /// stamp repeats instead.
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(3);
        match self.tasks.iter().map(|task| task.created_at).max() {
            Some(latest) if latest >= now => latest
                .checked_add_signed(Duration::milliseconds(1))
                .unwrap_or(latest),
            _ => now,
        }
    }
}

fn renumber_section(mut tasks: Vec<Task>, section: Section) -> (Vec<Task>, i64) {
    let mut members: Vec<usize> = (0..tasks.len())
        .filter(|&idx| tasks[idx].section == section)
        .collect();
    members.sort_by(|&a, &b| effective_order(&tasks[a], &tasks[b]));
    for (slot, &idx) in members.iter().enumerate() {
        tasks[idx].order = Some(slot as i64);
    }
    debug!(?section, count = members.len(), "section renumbered before create");
    (tasks, members.len() as i64)
}
