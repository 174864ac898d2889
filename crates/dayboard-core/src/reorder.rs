use tracing::debug;

use crate::id::TaskId;
use crate::store::Snapshot;
use crate::task::{Section, Task};
use crate::view::effective_order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

/// Drops `moved` onto `target` within their shared section and renumbers the
/// section `0..k`. Unknown ids, a self-drop, or a cross-section drop return
/// the snapshot unchanged.
pub fn reorder(snapshot: &Snapshot, moved: &TaskId, target: &TaskId) -> Snapshot {
    if moved == target {
        return snapshot.clone();
    }
    let (Some(moved_task), Some(target_task)) = (snapshot.get(moved), snapshot.get(target))
    else {
        debug!(%moved, %target, "reorder with unknown task ignored");
        return snapshot.clone();
    };
    if moved_task.section != target_task.section {
        debug!(%moved, %target, "cross-section reorder ignored");
        return snapshot.clone();
    }

    let section = moved_task.section;
    let mut sequence = section_sequence(snapshot, section);

    let (Some(from), Some(to)) = (
        sequence.iter().position(|id| id == moved),
        sequence.iter().position(|id| id == target),
    ) else {
        return snapshot.clone();
    };

    let id = sequence.remove(from);
    sequence.insert(to, id);
    debug!(%moved, %target, from, to, ?section, "section reordered");

    renumber(snapshot, &sequence)
}

/// Moves a task to the first or last slot of its section.
pub fn move_to_edge(snapshot: &Snapshot, id: &TaskId, edge: Edge) -> Snapshot {
    let Some(task) = snapshot.get(id) else {
        return snapshot.clone();
    };
    let sequence = section_sequence(snapshot, task.section);
    let target = match edge {
        Edge::Top => sequence.first(),
        Edge::Bottom => sequence.last(),
    };
    match target {
        Some(target) => reorder(snapshot, id, target),
        None => snapshot.clone(),
    }
}

fn section_sequence(snapshot: &Snapshot, section: Section) -> Vec<TaskId> {
    let mut tasks: Vec<&Task> = snapshot.section_tasks(section).collect();
    tasks.sort_by(|a, b| effective_order(a, b));
    tasks.into_iter().map(|task| task.id.clone()).collect()
}

fn renumber(snapshot: &Snapshot, sequence: &[TaskId]) -> Snapshot {
    let tasks = snapshot
        .tasks()
        .iter()
        .cloned()
        .map(|mut task| {
            if let Some(idx) = sequence.iter().position(|id| id == &task.id) {
                task.order = Some(idx as i64);
            }
            task
        })
        .collect();
    Snapshot::from_tasks(tasks)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::{Edge, move_to_edge, reorder};
    use crate::id::TaskId;
    use crate::store::Snapshot;
    use crate::task::{Section, Task};
    use crate::view::{ViewQuery, filtered};

    fn task(id: &str, section: Section, minute: i64, order: Option<i64>) -> Task {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).single().expect("valid time")
            + Duration::minutes(minute);
        let mut task = Task::new(TaskId::from(id), id.to_uppercase(), section, at);
        task.order = order;
        task
    }

    fn morning_ids(snap: &Snapshot) -> Vec<String> {
        filtered(snap, &ViewQuery::default())
            .into_iter()
            .filter(|task| task.section == Section::Morning)
            .map(|task| task.id.to_string())
            .collect()
    }

    fn orders(snap: &Snapshot, section: Section) -> Vec<(String, Option<i64>)> {
        let mut out: Vec<_> = snap
            .section_tasks(section)
            .map(|task| (task.id.to_string(), task.order))
            .collect();
        out.sort();
        out
    }

    #[test]
    fn drag_newest_onto_oldest_renumbers_section() {
        let snap = Snapshot::from_tasks(vec![
            task("a", Section::Morning, 0, None),
            task("b", Section::Morning, 1, None),
            task("c", Section::Morning, 2, None),
        ]);
        assert_eq!(morning_ids(&snap), vec!["c", "b", "a"]);

        let next = reorder(&snap, &TaskId::from("c"), &TaskId::from("a"));
        assert_eq!(morning_ids(&next), vec!["b", "a", "c"]);
        assert_eq!(
            orders(&next, Section::Morning),
            vec![
                ("a".to_string(), Some(1)),
                ("b".to_string(), Some(0)),
                ("c".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn dragging_up_shifts_siblings_down() {
        let snap = Snapshot::from_tasks(vec![
            task("a", Section::Morning, 0, Some(0)),
            task("b", Section::Morning, 1, Some(1)),
            task("c", Section::Morning, 2, Some(5)),
            task("d", Section::Morning, 3, Some(9)),
        ]);

        let next = reorder(&snap, &TaskId::from("d"), &TaskId::from("b"));
        assert_eq!(morning_ids(&next), vec!["a", "d", "b", "c"]);
        let mut values: Vec<i64> = next
            .section_tasks(Section::Morning)
            .filter_map(|task| task.order)
            .collect();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[test]
    fn other_sections_are_untouched() {
        let snap = Snapshot::from_tasks(vec![
            task("a", Section::Morning, 0, Some(3)),
            task("b", Section::Morning, 1, Some(7)),
            task("x", Section::Midday, 2, Some(42)),
            task("y", Section::Midday, 3, None),
        ]);

        let next = reorder(&snap, &TaskId::from("a"), &TaskId::from("b"));
        assert_eq!(orders(&next, Section::Midday), orders(&snap, Section::Midday));
        assert_eq!(morning_ids(&next), vec!["b", "a"]);
    }

    #[test]
    fn noop_cases_return_same_snapshot() {
        let snap = Snapshot::from_tasks(vec![
            task("a", Section::Morning, 0, None),
            task("b", Section::AfterWork, 1, None),
        ]);

        assert_eq!(reorder(&snap, &TaskId::from("a"), &TaskId::from("a")), snap);
        assert_eq!(reorder(&snap, &TaskId::from("a"), &TaskId::from("b")), snap);
        assert_eq!(reorder(&snap, &TaskId::from("a"), &TaskId::from("zz")), snap);
        assert_eq!(reorder(&snap, &TaskId::from("zz"), &TaskId::from("a")), snap);
    }

    #[test]
    fn move_to_edges() {
        let snap = Snapshot::from_tasks(vec![
            task("a", Section::Morning, 0, Some(0)),
            task("b", Section::Morning, 1, Some(1)),
            task("c", Section::Morning, 2, Some(2)),
        ]);

        let top = move_to_edge(&snap, &TaskId::from("c"), Edge::Top);
        assert_eq!(morning_ids(&top), vec!["c", "a", "b"]);

        let bottom = move_to_edge(&top, &TaskId::from("c"), Edge::Bottom);
        assert_eq!(morning_ids(&bottom), vec!["a", "b", "c"]);

        assert_eq!(move_to_edge(&snap, &TaskId::from("zz"), Edge::Top), snap);
    }
}
