//! History fill: `+` body lines become the commits made during the entry

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::warn;

use crate::domain::{Diagnostic, LogEntry, Project};
use crate::external::CommitLog;

static GIT_SHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[git:(?P<sha>[0-9a-f]{4,})\]").expect("git sha regex"));

fn is_marker(line: &str) -> bool {
    line.trim() == "+"
}

/// True if the entry asks for history fill
pub(super) fn has_marker(entry: &LogEntry) -> bool {
    entry.body.iter().any(|line| is_marker(line))
}

/// Fills every marked entry; returns the number of lines added
pub(super) fn fill(
    project: &mut Project,
    commits: Option<&dyn CommitLog>,
    author: Option<&str>,
    now: NaiveDateTime,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    let mut added = 0;

    for entry in project.log.entries_mut().filter(|e| has_marker(e)) {
        let (Some(commits), Some(author)) = (commits, author) else {
            diagnostics.push(Diagnostic::history(format!(
                "{}: no commit history available",
                entry.head()
            )));
            continue;
        };

        let until = entry.until().unwrap_or(now);
        let found = match commits.commits_by(author, entry.begin(), until) {
            Ok(found) => found,
            Err(e) => {
                warn!(entry = %entry.head(), "history fill failed: {}", e);
                diagnostics.push(Diagnostic::history(format!("{}: {}", entry.head(), e)));
                continue;
            }
        };

        let seen: Vec<String> = entry
            .body
            .iter()
            .filter_map(|line| GIT_SHA_RE.captures(line).map(|c| c["sha"].to_string()))
            .collect();

        let lines: Vec<String> = found
            .filter(|c| {
                !seen
                    .iter()
                    .any(|s| c.short_id.starts_with(s.as_str()) || s.starts_with(c.short_id.as_str()))
            })
            .map(|c| format!(" - [git:{}] {}", c.short_id, c.summary))
            .collect();
        added += lines.len();

        let Some(at) = entry.body.iter().position(|line| is_marker(line)) else {
            continue;
        };
        entry.body.splice(at..=at, lines);
        entry.body.retain(|line| !is_marker(line));
    }

    added
}
