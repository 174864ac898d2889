use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// Time-of-day column a task is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    Morning,
    Midday,
    AfterWork,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Morning, Section::Midday, Section::AfterWork];

    pub fn label(self) -> &'static str {
        match self {
            Section::Morning => "Morning",
            Section::Midday => "Midday",
            Section::AfterWork => "After work",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section: {0} (expected morning, midday or afterwork)")]
pub struct ParseSectionError(String);

impl FromStr for Section {
    type Err = ParseSectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Section::Morning),
            "midday" | "noon" => Ok(Section::Midday),
            "afterwork" | "after-work" | "after_work" | "evening" => Ok(Section::AfterWork),
            other => Err(ParseSectionError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    pub section: Section,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Task {
    /// Builds an open task. `title` is expected to be normalized already.
    pub fn new(id: TaskId, title: String, section: Section, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            section,
            category: None,
            done: false,
            comment: None,
            created_at: now,
            order: None,
        }
    }

    /// Re-applies field normalization. Returns `None` when the title is empty.
    pub fn normalized(mut self) -> Option<Self> {
        self.title = normalize_title(&self.title)?;
        self.category = self.category.as_deref().and_then(normalize_category);
        self.comment = self.comment.as_deref().and_then(normalize_comment);
        Some(self)
    }
}

/// Collapses whitespace runs to single spaces and trims. Empty yields `None`.
pub fn normalize_title(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub fn normalize_category(raw: &str) -> Option<String> {
    normalize_title(raw)
}

/// Comments keep their inner layout; only the ends are trimmed.
pub fn normalize_comment(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
