use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Snapshot;
use crate::task::{Section, Task, normalize_category};

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    /// `"All"` (or nothing) selects every task; any other text is a category.
    pub fn parse(raw: &str) -> Self {
        match normalize_category(raw) {
            None => CategoryFilter::All,
            Some(name) if name == ALL_CATEGORIES => CategoryFilter::All,
            Some(name) => CategoryFilter::Named(name),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => task.category.as_deref() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_CATEGORIES),
            CategoryFilter::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub category: CategoryFilter,
    pub only_incomplete: bool,
}

impl ViewQuery {
    pub fn matches(&self, task: &Task) -> bool {
        self.category.matches(task) && (!self.only_incomplete || !task.done)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStats {
    pub done: usize,
    pub total: usize,
    pub pct: u8,
}

impl SectionStats {
    fn from_counts(done: usize, total: usize) -> Self {
        Self {
            done,
            total,
            pct: pct(done, total),
        }
    }
}

/// Whole-number percentage, rounded half up. Zero when `total` is zero.
pub fn pct(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as u64;
    let total = total as u64;
    ((200 * done + total) / (2 * total)) as u8
}

/// Display ordering: explicit `order` ascending first, then unordered tasks.
/// Equal keys fall back to newest `created_at` first.
pub fn effective_order(a: &Task, b: &Task) -> Ordering {
    let by_order = match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_order.then_with(|| b.created_at.cmp(&a.created_at))
}

/// `"All"` followed by every distinct category, collated case-insensitively
/// on an ASCII transliteration. A stored category spelled `All` is listed once.
pub fn categories(snapshot: &Snapshot) -> Vec<String> {
    let distinct: BTreeSet<&str> = snapshot
        .tasks()
        .iter()
        .filter_map(|task| task.category.as_deref())
        .filter(|category| !category.is_empty() && *category != ALL_CATEGORIES)
        .collect();

    let mut sorted: Vec<&str> = distinct.into_iter().collect();
    sorted.sort_by_cached_key(|category| (collation_key(category), category.to_string()));

    let mut out = Vec::with_capacity(sorted.len() + 1);
    out.push(ALL_CATEGORIES.to_string());
    out.extend(sorted.into_iter().map(str::to_string));
    out
}

pub fn filtered(snapshot: &Snapshot, query: &ViewQuery) -> Vec<Task> {
    let mut out: Vec<Task> = snapshot
        .tasks()
        .iter()
        .filter(|task| query.matches(task))
        .cloned()
        .collect();
    out.sort_by(effective_order);
    out
}

/// Per-section counts over an already filtered list. Every section is present.
pub fn section_stats(tasks: &[Task]) -> BTreeMap<Section, SectionStats> {
    Section::ALL
        .into_iter()
        .map(|section| {
            let (done, total) = tasks
                .iter()
                .filter(|task| task.section == section)
                .fold((0, 0), |(done, total), task| {
                    (done + usize::from(task.done), total + 1)
                });
            (section, SectionStats::from_counts(done, total))
        })
        .collect()
}

pub fn global_progress(tasks: &[Task]) -> u8 {
    let done = tasks.iter().filter(|task| task.done).count();
    pct(done, tasks.len())
}

fn collation_key(text: &str) -> String {
    deunicode::deunicode(text).to_lowercase()
}
