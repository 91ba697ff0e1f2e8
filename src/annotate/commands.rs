//! Duration fill, year stamping and command expansion

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::{insert_dated, new_entry, AnnotateOptions, ExpansionKind};
use crate::domain::{CommandKind, LogItem, Project, TimeReference};

/// Rewrites entry headers with their computed durations
pub(super) fn fill_durations(project: &mut Project) {
    let changed = project
        .log
        .entries_mut()
        .map(|entry| entry.refresh_head())
        .filter(|changed| *changed)
        .count();
    debug!(changed, "filled durations");
}

/// Index after the last item that is not a pending command
fn trailing_commands_start(project: &Project) -> usize {
    project
        .log
        .items
        .iter()
        .rposition(|item| !matches!(item, LogItem::Command(_)))
        .map_or(0, |idx| idx + 1)
}

/// True when the log does not end in the current year
pub(super) fn trailing_year_missing(project: &Project, today: NaiveDate) -> bool {
    let end = trailing_commands_start(project);
    project.log.items[..end]
        .iter()
        .rev()
        .find_map(LogItem::reference_date)
        .is_none_or(|date| date.year() != today.year())
}

/// Adds the year references needed to read the log back unambiguously
///
/// A log that does not start with a reference gets one for the year of its
/// first entry. Unless the project is archived, a reference to the current
/// year closes the log, ahead of any pending commands, so that entries
/// added later resolve in the right year.
pub(super) fn stamp_years(project: &mut Project, today: NaiveDate) {
    let items = &mut project.log.items;

    if items.is_empty() {
        items.push(LogItem::Reference(TimeReference::year(today)));
        return;
    }

    if !matches!(items.first(), Some(LogItem::Reference(_))) {
        let first = items
            .iter()
            .find_map(LogItem::reference_date)
            .unwrap_or(today);
        items.insert(0, LogItem::Reference(TimeReference::year(first)));
    }

    if !project.meta.archived() && trailing_year_missing(project, today) {
        let at = trailing_commands_start(project);
        project
            .log
            .items
            .insert(at, LogItem::Reference(TimeReference::year(today)));
    }
}

/// Expands the first pending command into an entry for `today`
pub(super) fn expand_next(
    project: &mut Project,
    kind: ExpansionKind,
    options: &AnnotateOptions,
    today: NaiveDate,
) -> bool {
    let Some(idx) = project
        .log
        .items
        .iter()
        .position(|item| matches!(item, LogItem::Command(_)))
    else {
        return false;
    };

    let LogItem::Command(command) = project.log.items.remove(idx) else {
        return false;
    };
    debug!(?kind, head = %command.head, "expanding command");

    let times = match command.kind {
        CommandKind::Day => None,
        CommandKind::Time { start, end } => Some((start, end)),
    };

    let mut entry = new_entry(options, project, today, times);
    for tag in &command.tags {
        entry.add_tag(tag);
    }
    entry.body = command.body;
    if command.fill {
        entry.body.push(" +".to_string());
    }
    entry.refresh_head();

    insert_dated(project, idx, LogItem::Entry(entry), today);
    true
}
