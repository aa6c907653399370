//! Console rendering of report sections as aligned text tables

use hybrid_common::time::display;
use std::io::{self, Write};

use crate::report::HybridReport;

/// One titled table
#[derive(Debug, Clone)]
pub struct Table {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let widths = self.widths();
        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");

        writeln!(out, "{}", self.title)?;
        write_row(out, &self.headers, &widths)?;
        writeln!(out, "+{}+", separator)?;
        for row in &self.rows {
            write_row(out, row, &widths)?;
        }
        if self.rows.is_empty() {
            writeln!(out, "(no rows)")?;
        }
        writeln!(out)
    }
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!(" {}{} ", cell, " ".repeat(pad))
        })
        .collect();
    writeln!(out, "|{}|", padded.join("|"))
}

/// Render every report section in run order
pub fn render_report<W: Write>(report: &HybridReport, out: &mut W) -> io::Result<()> {
    let mut timeline = Table::new("User Timeline (relational)", &["id", "content", "created_at", "author_name"]);
    for entry in &report.timeline {
        timeline.push(vec![
            entry.id.to_string(),
            entry.content.clone(),
            display(&entry.created_at),
            entry.author_name.clone(),
        ]);
    }
    timeline.write_to(out)?;

    let mut engagement = Table::new(
        "Post Engagement Metrics (relational)",
        &["post_id", "content", "total_likes", "author_name"],
    );
    for metric in &report.engagement {
        engagement.push(vec![
            metric.post_id.to_string(),
            metric.content.clone(),
            metric.total_likes.to_string(),
            metric.author_name.clone(),
        ]);
    }
    engagement.write_to(out)?;

    let mut activity = Table::new(
        "User Activity Feed (document)",
        &["user_id", "activity_type", "reference_id", "timestamp", "content_preview"],
    );
    for event in &report.activity {
        activity.push(vec![
            event.user_id.to_string(),
            event.kind.to_string(),
            event.reference_id.map(|id| id.to_string()).unwrap_or_default(),
            display(&event.timestamp),
            event
                .metadata
                .get("content_preview")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        ]);
    }
    activity.write_to(out)?;

    let mut preferences = Table::new(
        "Users with Theme Preference (document)",
        &["user_id", "theme", "language", "notifications"],
    );
    for pref in &report.themed_preferences {
        let notifications = pref
            .preferences
            .notifications
            .iter()
            .map(|(kind, on)| format!("{}={}", kind, on))
            .collect::<Vec<_>>()
            .join(" ");
        preferences.push(vec![
            pref.user_id.to_string(),
            pref.preferences.theme.clone().unwrap_or_default(),
            pref.preferences.language.clone().unwrap_or_default(),
            notifications,
        ]);
    }
    preferences.write_to(out)?;

    let mut feed = Table::new(
        "Hybrid Feed (relational + document)",
        &["post_id", "content", "created_at", "activity_count", "activity_types"],
    );
    for item in &report.feed {
        feed.push(vec![
            item.post_id.to_string(),
            item.content.clone(),
            display(&item.created_at),
            item.activity_count.to_string(),
            item.activity_types.clone(),
        ]);
    }
    feed.write_to(out)
}
