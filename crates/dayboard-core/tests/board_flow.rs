use chrono::{Duration, TimeZone, Utc};
use dayboard_core::board::Board;
use dayboard_core::datastore::{DEFAULT_STORAGE_KEY, FileStore, MemoryStore, PersistenceBridge};
use dayboard_core::store::{Snapshot, TaskDraft, TaskPatch};
use dayboard_core::task::Section;
use dayboard_core::view::{CategoryFilter, SectionStats, ViewQuery, filtered, section_stats};
use tempfile::tempdir;

fn morning_titles(snapshot: &Snapshot) -> Vec<String> {
    filtered(snapshot, &ViewQuery::default())
        .into_iter()
        .filter(|task| task.section == Section::Morning)
        .map(|task| task.title)
        .collect()
}

#[test]
fn file_backed_board_survives_restart() {
    let temp = tempdir().expect("tempdir");
    let now = Utc::now();

    let (a, b) = {
        let store = FileStore::open(temp.path()).expect("open store");
        let mut board = Board::open(PersistenceBridge::new(store, DEFAULT_STORAGE_KEY));
        let a = board
            .create(
                TaskDraft::new("  Make   tea ", Section::Morning)
                    .category("Home")
                    .comment(" green "),
                now,
            )
            .expect("create a");
        let b = board
            .create(TaskDraft::new("Answer mail", Section::Morning), now)
            .expect("create b");
        board.toggle_done(&b).expect("toggle b");
        (a, b)
    };

    let store = FileStore::open(temp.path()).expect("reopen store");
    let board = Board::open(PersistenceBridge::new(store, DEFAULT_STORAGE_KEY));
    let tea = board.get(&a).expect("tea persisted");
    assert_eq!(tea.title, "Make tea");
    assert_eq!(tea.comment.as_deref(), Some("green"));
    assert_eq!(tea.order, Some(0));
    assert!(board.get(&b).expect("mail persisted").done);
}

#[test]
fn legacy_unordered_tasks_then_manual_reorder() {
    let payload = r#"[
        {"id":"a","title":"A","section":"Morning","done":false,"createdAt":1000},
        {"id":"b","title":"B","section":"Morning","done":false,"createdAt":2000},
        {"id":"c","title":"C","section":"Morning","done":false,"createdAt":3000},
        {"id":"m","title":"M","section":"Midday","done":false,"createdAt":4000}
    ]"#;
    let mut board = Board::open(PersistenceBridge::new(
        MemoryStore::with_entry(DEFAULT_STORAGE_KEY, payload),
        DEFAULT_STORAGE_KEY,
    ));
    assert_eq!(morning_titles(board.snapshot()), vec!["C", "B", "A"]);

    assert!(board.reorder(&"c".into(), &"a".into()));
    assert_eq!(morning_titles(board.snapshot()), vec!["B", "A", "C"]);

    let mut orders: Vec<(String, Option<i64>)> = board
        .snapshot()
        .section_tasks(Section::Morning)
        .map(|task| (task.title.clone(), task.order))
        .collect();
    orders.sort();
    assert_eq!(
        orders,
        vec![
            ("A".to_string(), Some(1)),
            ("B".to_string(), Some(0)),
            ("C".to_string(), Some(2)),
        ]
    );
    assert_eq!(board.get(&"m".into()).expect("midday task").order, None);

    assert!(!board.reorder(&"c".into(), &"m".into()));
}

#[test]
fn created_orders_are_contiguous_per_section() {
    let base = Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).single().expect("valid time");
    let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
    let mut ids = Vec::new();
    for minute in 0..4 {
        let id = board
            .create(
                TaskDraft::new(format!("task {minute}"), Section::AfterWork),
                base + Duration::minutes(minute),
            )
            .expect("create");
        ids.push(id);
    }
    board.reorder(&ids[0], &ids[3]);

    let mut values: Vec<i64> = board
        .snapshot()
        .section_tasks(Section::AfterWork)
        .filter_map(|task| task.order)
        .collect();
    values.sort();
    assert_eq!(values, vec![0, 1, 2, 3]);
}

#[test]
fn unknown_category_filter_empties_everything() {
    let now = Utc::now();
    let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
    board
        .create(TaskDraft::new("Stand-up", Section::Midday).category("Team"), now)
        .expect("create");

    let query = ViewQuery {
        category: CategoryFilter::parse("Work"),
        only_incomplete: false,
    };
    let list = board.filtered(&query);
    assert!(list.is_empty());
    for stats in section_stats(&list).values() {
        assert_eq!(*stats, SectionStats::default());
    }
}

#[test]
fn blank_title_update_keeps_snapshot() {
    let now = Utc::now();
    let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
    let id = board
        .create(TaskDraft::new("Dishes", Section::AfterWork), now)
        .expect("create");
    let before = board.snapshot().clone();

    let result = board.update(
        &id,
        TaskPatch {
            title: Some("   ".to_string()),
            section: Some(Section::Morning),
            ..TaskPatch::default()
        },
    );
    assert!(result.is_err());
    assert_eq!(board.snapshot(), &before);
}

#[test]
fn deleted_ids_never_come_back() {
    let now = Utc::now();
    let mut board = Board::open(PersistenceBridge::new(MemoryStore::new(), DEFAULT_STORAGE_KEY));
    let keep = board
        .create(TaskDraft::new("Keep", Section::Morning).category("A"), now)
        .expect("create");
    let gone = board
        .create(TaskDraft::new("Gone", Section::Morning).category("B"), now)
        .expect("create");

    assert!(board.delete(&gone));
    assert!(board.get(&gone).is_none());
    assert!(board.filtered(&ViewQuery::default()).iter().all(|task| task.id != gone));
    assert_eq!(board.categories(), vec!["All", "A"]);
    assert!(board.get(&keep).is_some());
}
