use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::store::Snapshot;
use crate::task::{Section, Task};
use crate::view::{SectionStats, ViewQuery};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Writes every section with its stats, then the overall progress line.
    /// Ids are shortened against the whole `snapshot`, not only the listed tasks.
    #[tracing::instrument(skip(self, writer, snapshot, tasks, stats))]
    pub fn write_board<W: Write>(
        &self,
        mut writer: W,
        snapshot: &Snapshot,
        query: &ViewQuery,
        tasks: &[Task],
        stats: &BTreeMap<Section, SectionStats>,
        progress: u8,
    ) -> anyhow::Result<()> {
        let mut heading = format!("Category: {}", query.category);
        if query.only_incomplete {
            heading.push_str("  (open only)");
        }
        writeln!(writer, "{}", self.paint(&heading, "1"))?;

        for section in Section::ALL {
            let section_stats = stats.get(&section).copied().unwrap_or_default();
            writeln!(writer)?;
            writeln!(
                writer,
                "{} {}/{} ({}%)",
                self.paint(section.label(), "1;36"),
                section_stats.done,
                section_stats.total,
                section_stats.pct
            )?;

            let rows: Vec<Vec<String>> = tasks
                .iter()
                .filter(|task| task.section == section)
                .map(|task| self.task_row(snapshot, task))
                .collect();

            if rows.is_empty() {
                writeln!(writer, "  -")?;
            } else {
                write_rows(&mut writer, rows)?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Progress {}", progress_bar(progress))?;
        Ok(())
    }

    pub fn write_categories<W: Write>(
        &self,
        mut writer: W,
        categories: &[String],
        active: &str,
    ) -> anyhow::Result<()> {
        for category in categories {
            if category == active {
                writeln!(writer, "{}", self.paint(&format!("* {category}"), "1"))?;
            } else {
                writeln!(writer, "  {category}")?;
            }
        }
        Ok(())
    }

    fn task_row(&self, snapshot: &Snapshot, task: &Task) -> Vec<String> {
        let mark = if task.done {
            self.paint("[x]", "32")
        } else {
            "[ ]".to_string()
        };
        let title = if task.done {
            self.paint(&task.title, "2")
        } else {
            task.title.clone()
        };
        let category = task
            .category
            .as_deref()
            .map(|category| self.paint(&format!("@{category}"), "35"))
            .unwrap_or_default();
        let comment = task
            .comment
            .as_deref()
            .map(|comment| comment.lines().next().unwrap_or_default().to_string())
            .unwrap_or_default();

        vec![
            mark,
            self.paint(snapshot.short_id(&task.id), "33"),
            title,
            category,
            comment,
        ]
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) / 5;
    format!(
        "[{}{}] {progress}%",
        "#".repeat(filled),
        ".".repeat(20 - filled)
    )
}

fn write_rows<W: Write>(mut writer: W, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; column_count];

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for row in rows {
        let mut line = String::from(" ");
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(padding));
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
