use std::io::{self, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::board::Board;
use crate::cli::Command;
use crate::config::Config;
use crate::datastore::KvStore;
use crate::error::BoardError;
use crate::id::TaskId;
use crate::reorder::Edge;
use crate::render::Renderer;
use crate::store::{Snapshot, TaskDraft, TaskPatch};
use crate::view::{CategoryFilter, ViewQuery};

#[instrument(skip(board, cfg, renderer, out, command))]
pub fn dispatch<S: KvStore, W: Write>(
    board: &mut Board<S>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    command: Option<Command>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let command = command.unwrap_or(Command::List {
        category: None,
        incomplete: false,
        all: false,
    });
    debug!(?command, "dispatching command");

    match command {
        Command::Add {
            title,
            section,
            category,
            comment,
        } => {
            info!("command add");
            let draft = TaskDraft {
                title: title.join(" "),
                section,
                category,
                comment,
            };
            match board.create(draft, now) {
                Ok(id) => writeln!(
                    out,
                    "Created task {} in {section}.",
                    board.snapshot().short_id(&id)
                )?,
                Err(err) => report_unchanged(out, &err)?,
            }
        }
        Command::Edit {
            id,
            title,
            section,
            category,
            no_category,
            comment,
            no_comment,
        } => {
            info!("command edit");
            let id = resolve_id(board.snapshot(), &id)?;
            let patch = TaskPatch {
                title,
                section,
                category: if no_category { Some(None) } else { category.map(Some) },
                comment: if no_comment { Some(None) } else { comment.map(Some) },
            };
            if patch.is_empty() {
                writeln!(out, "Nothing to change.")?;
                return Ok(());
            }
            match board.update(&id, patch) {
                Ok(()) => writeln!(out, "Updated task {}.", board.snapshot().short_id(&id))?,
                Err(err) => report_unchanged(out, &err)?,
            }
        }
        Command::Done { id } => {
            info!("command done");
            let id = resolve_id(board.snapshot(), &id)?;
            match board.toggle_done(&id) {
                Ok(true) => writeln!(out, "Task {} done.", board.snapshot().short_id(&id))?,
                Ok(false) => writeln!(out, "Task {} reopened.", board.snapshot().short_id(&id))?,
                Err(err) => report_unchanged(out, &err)?,
            }
        }
        Command::Rm { id } => {
            info!("command rm");
            let id = resolve_id(board.snapshot(), &id)?;
            let short = board.snapshot().short_id(&id).to_string();
            if board.delete(&id) {
                writeln!(out, "Deleted task {short}.")?;
            }
        }
        Command::Clear { yes } => {
            info!("command clear");
            if !yes {
                return Err(anyhow!(
                    "refusing to delete all tasks without --yes"
                ));
            }
            let removed = board.clear_all();
            writeln!(out, "Deleted {removed} task(s).")?;
        }
        Command::Reset => {
            info!("command reset");
            board.reset_all_done();
            writeln!(out, "All tasks reopened.")?;
        }
        Command::List {
            category,
            incomplete,
            all,
        } => {
            let query = list_query(cfg, category.as_deref(), incomplete, all);
            let tasks = board.filtered(&query);
            let stats = crate::view::section_stats(&tasks);
            let progress = crate::view::global_progress(&tasks);
            renderer.write_board(&mut *out, board.snapshot(), &query, &tasks, &stats, progress)?;
        }
        Command::Categories => {
            let active = cfg.default_query().category.to_string();
            renderer.write_categories(&mut *out, &board.categories(), &active)?;
        }
        Command::Move { moved, target } => {
            info!("command move");
            let moved = resolve_id(board.snapshot(), &moved)?;
            let target = resolve_id(board.snapshot(), &target)?;
            if board.reorder(&moved, &target) {
                writeln!(out, "Moved task {}.", board.snapshot().short_id(&moved))?;
            } else {
                writeln!(
                    out,
                    "Nothing moved (tasks must share a section and differ)."
                )?;
            }
        }
        Command::Top { id } => move_edge(board, out, &id, Edge::Top)?,
        Command::Bottom { id } => move_edge(board, out, &id, Edge::Bottom)?,
    }

    Ok(())
}

fn move_edge<S: KvStore, W: Write>(
    board: &mut Board<S>,
    out: &mut W,
    raw: &str,
    edge: Edge,
) -> anyhow::Result<()> {
    info!(?edge, "command move to edge");
    let id = resolve_id(board.snapshot(), raw)?;
    let moved = board.move_to_edge(&id, edge);
    let short = board.snapshot().short_id(&id);
    if moved {
        writeln!(out, "Moved task {short}.")?;
    } else {
        writeln!(out, "Task {short} is already there.")?;
    }
    Ok(())
}

/// Command-line flags win over the configured default filter.
fn list_query(cfg: &Config, category: Option<&str>, incomplete: bool, all: bool) -> ViewQuery {
    let mut query = cfg.default_query();
    if let Some(category) = category {
        query.category = CategoryFilter::parse(category);
    }
    if incomplete {
        query.only_incomplete = true;
    } else if all {
        query.only_incomplete = false;
    }
    query
}

/// Accepts a full id or any prefix that names exactly one task.
pub fn resolve_id(snapshot: &Snapshot, raw: &str) -> anyhow::Result<TaskId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("task id cannot be empty"));
    }
    let exact = TaskId::from(raw);
    if snapshot.contains(&exact) {
        return Ok(exact);
    }

    match snapshot.matching_prefix(raw).as_slice() {
        [] => Err(anyhow!("no task matches id {raw}")),
        [task] => Ok(task.id.clone()),
        many => Err(anyhow!("id {raw} is ambiguous ({} matches)", many.len())),
    }
}

fn report_unchanged<W: Write>(out: &mut W, err: &BoardError) -> io::Result<()> {
    writeln!(out, "Nothing changed: {err}.")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{dispatch, resolve_id};
    use crate::board::Board;
    use crate::cli::Command;
    use crate::config::Config;
    use crate::datastore::{DEFAULT_STORAGE_KEY, MemoryStore, PersistenceBridge};
    use crate::id::TaskId;
    use crate::render::Renderer;
    use crate::store::Snapshot;
    use crate::task::{Section, Task};

    fn run(board: &mut Board<MemoryStore>, command: Command) -> String {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).single().expect("valid time");
        let mut out = Vec::new();
        dispatch(
            board,
            &Config::default(),
            &Renderer::plain(),
            &mut out,
            Some(command),
            now,
        )
        .expect("dispatch");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn prefix_resolution() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).single().expect("valid time");
        let snap = Snapshot::from_tasks(vec![
            Task::new(TaskId::from("abc1"), "one".to_string(), Section::Morning, at),
            Task::new(TaskId::from("abc2"), "two".to_string(), Section::Morning, at),
            Task::new(TaskId::from("xyz"), "three".to_string(), Section::Midday, at),
        ]);

        assert_eq!(resolve_id(&snap, "x").expect("unique"), TaskId::from("xyz"));
        assert_eq!(resolve_id(&snap, "abc2").expect("exact"), TaskId::from("abc2"));
        assert!(resolve_id(&snap, "abc").is_err());
        assert!(resolve_id(&snap, "q").is_err());
    }

    #[test]
    fn printed_short_ids_resolve_back_to_their_task() {
        let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
        for title in ["first", "second", "third"] {
            run(
                &mut board,
                Command::Add {
                    title: vec![title.to_string()],
                    section: Section::Morning,
                    category: None,
                    comment: None,
                },
            );
        }

        let snapshot = board.snapshot();
        for task in snapshot.tasks() {
            let short = snapshot.short_id(&task.id);
            assert!(short.len() >= 8);
            assert_eq!(resolve_id(snapshot, short).expect("unique short id"), task.id);
        }
    }

    #[test]
    fn add_toggle_and_list() {
        let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));

        let text = run(
            &mut board,
            Command::Add {
                title: vec!["stretch".to_string(), " ".to_string()],
                section: Section::Morning,
                category: Some("Health".to_string()),
                comment: None,
            },
        );
        assert!(text.starts_with("Created task "));
        let id = board.snapshot().tasks()[0].id.to_string();

        let text = run(&mut board, Command::Done { id: id.clone() });
        assert!(text.ends_with("done.\n"));

        let text = run(
            &mut board,
            Command::List {
                category: Some("Health".to_string()),
                incomplete: false,
                all: false,
            },
        );
        assert!(text.contains("Morning 1/1 (100%)"));
        assert!(text.contains("stretch"));
    }

    #[test]
    fn blank_title_is_reported_not_fatal() {
        let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
        let text = run(
            &mut board,
            Command::Add {
                title: vec!["  ".to_string()],
                section: Section::Midday,
                category: None,
                comment: None,
            },
        );
        assert_eq!(text, "Nothing changed: task title cannot be empty.\n");
        assert!(board.snapshot().is_empty());
    }
}
