//! The annotate pass
//!
//! One pass rewrites a project in place:
//!
//! 1. [`Step::DurationFill`] writes the duration of closed entries
//! 2. [`Step::YearStamp`] makes sure every entry can be dated on re-read
//! 3. [`Step::CommandExpansion`] turns shorthand lines into entries for today
//! 4. [`Step::HistoryFill`] replaces `+` body lines with commits
//! 5. [`Step::TaskReconcile`] syncs task lines with the tracker
//!
//! Each step only runs when there is something for it to do. Collaborator
//! failures never abort the pass: the affected entry or task line keeps its
//! previous state and a [`Diagnostic`] is reported.

mod commands;
mod history;
mod reconcile;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    format_datetime, CommandKind, Diagnostic, LogEntry, LogItem, Project, TimeReference,
};
use crate::external::{CommitLog, Tracker};
use crate::storage::{IdMap, SidecarStore};

/// The time an annotate pass runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    now: NaiveDateTime,
}

impl Clock {
    /// Local wall-clock time
    pub fn system() -> Self {
        Self {
            now: Local::now().naive_local(),
        }
    }

    pub fn fixed(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}

/// Shape of a command being expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionKind {
    Day,
    Time,
}

impl From<CommandKind> for ExpansionKind {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Day => ExpansionKind::Day,
            CommandKind::Time { .. } => ExpansionKind::Time,
        }
    }
}

/// One unit of work of an annotate pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    DurationFill,
    YearStamp,
    CommandExpansion(ExpansionKind),
    HistoryFill,
    TaskReconcile,
}

/// Settings for an annotate pass
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// strftime pattern for the date of new entries
    pub date_format: String,
    /// strftime pattern for the times of new entries
    pub time_format: String,
    /// Commit author for history fill
    pub author: Option<String>,
    /// Tag => pattern matched against entry bodies
    pub autotag: Vec<(String, Regex)>,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            date_format: "%d %B".to_string(),
            time_format: "%H:%M".to_string(),
            author: None,
            autotag: Vec::new(),
        }
    }
}

/// What a pass did
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotateReport {
    pub steps: Vec<Step>,
    /// Load diagnostics followed by those of the pass
    pub diagnostics: Vec<Diagnostic>,
    pub expanded_commands: usize,
    pub history_lines: usize,
    pub created_tasks: usize,
    pub relocated_tasks: usize,
    /// Task id mapping after reconciliation, for the caller to save once
    /// the project is written
    #[serde(skip)]
    pub task_ids: Option<IdMap>,
}

/// Runs annotate passes
pub struct Annotator<'a> {
    clock: Clock,
    options: AnnotateOptions,
    tracker: Option<&'a mut dyn Tracker>,
    commits: Option<&'a dyn CommitLog>,
    sidecar: Option<&'a dyn SidecarStore>,
}

impl<'a> Annotator<'a> {
    pub fn new(clock: Clock, options: AnnotateOptions) -> Self {
        Self {
            clock,
            options,
            tracker: None,
            commits: None,
            sidecar: None,
        }
    }

    pub fn with_tracker(mut self, tracker: &'a mut dyn Tracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_commits(mut self, commits: &'a dyn CommitLog) -> Self {
        self.commits = Some(commits);
        self
    }

    pub fn with_sidecar(mut self, sidecar: &'a dyn SidecarStore) -> Self {
        self.sidecar = Some(sidecar);
        self
    }

    /// Steps a pass over `project` would run, in order
    pub fn plan(&self, project: &Project) -> Vec<Step> {
        let mut steps = Vec::new();

        if project.log.entries().next().is_some() {
            steps.push(Step::DurationFill);
        }
        if self.needs_year_stamp(project) {
            steps.push(Step::YearStamp);
        }
        steps.extend(
            project
                .log
                .commands()
                .map(|c| Step::CommandExpansion(c.kind.into())),
        );
        let fill_pending = project.log.commands().any(|c| c.fill)
            || project.log.entries().any(history::has_marker);
        if fill_pending {
            steps.push(Step::HistoryFill);
        }
        if self.tracker.is_some() && !project.body.tasks().is_empty() {
            steps.push(Step::TaskReconcile);
        }

        steps
    }

    /// Runs one pass, mutating `project`
    pub fn annotate(&mut self, project: &mut Project) -> AnnotateReport {
        let mut report = AnnotateReport {
            diagnostics: project.diagnostics.clone(),
            ..Default::default()
        };

        for step in self.plan(project) {
            debug!(?step, "annotate step");
            self.apply(step, project, &mut report);
            report.steps.push(step);
        }

        self.autotag(project);
        self.write_totals(project);
        write_parse_errors(project);
        project.separate_regions();

        info!(
            project = %project.name(),
            steps = report.steps.len(),
            diagnostics = report.diagnostics.len(),
            "annotated"
        );
        report
    }

    fn apply(&mut self, step: Step, project: &mut Project, report: &mut AnnotateReport) {
        match step {
            Step::DurationFill => commands::fill_durations(project),
            Step::YearStamp => commands::stamp_years(project, self.clock.today()),
            Step::CommandExpansion(kind) => {
                if commands::expand_next(project, kind, &self.options, self.clock.today()) {
                    report.expanded_commands += 1;
                }
            }
            Step::HistoryFill => {
                report.history_lines += history::fill(
                    project,
                    self.commits,
                    self.options.author.as_deref(),
                    self.clock.now(),
                    &mut report.diagnostics,
                );
            }
            Step::TaskReconcile => {
                if let Some(tracker) = self.tracker.as_deref_mut() {
                    let outcome = reconcile::reconcile(
                        project,
                        tracker,
                        self.sidecar,
                        &self.options,
                        self.clock.today(),
                        &mut report.diagnostics,
                    );
                    report.created_tasks += outcome.created;
                    report.relocated_tasks += outcome.relocated;
                    report.task_ids = outcome.ids;
                }
            }
        }
    }

    fn needs_year_stamp(&self, project: &Project) -> bool {
        let items = &project.log.items;
        if items.is_empty() {
            return !project.archived();
        }
        if !matches!(items.first(), Some(LogItem::Reference(_))) {
            return true;
        }
        !project.archived() && commands::trailing_year_missing(project, self.clock.today())
    }

    fn autotag(&self, project: &mut Project) {
        if self.options.autotag.is_empty() {
            return;
        }
        for entry in project.log.entries_mut() {
            let mut changed = false;
            for (tag, pattern) in &self.options.autotag {
                if entry.body.iter().any(|line| pattern.is_match(line)) {
                    changed |= entry.add_tag(tag);
                }
            }
            if changed {
                entry.refresh_head();
            }
        }
    }

    fn write_totals(&self, project: &mut Project) {
        if !project.meta.has("total") {
            return;
        }
        let durations = project.durations(self.clock.now());
        project.meta.set_total(durations.total, &durations.by_tag);
    }
}

/// Records unparsable log lines in the `Parse-Errors` field
///
/// Lines are numbered as they appear in the rewritten file. The field's own
/// height depends only on the number of errors, so it is set once to size
/// the header and once more with the final numbers.
fn write_parse_errors(project: &mut Project) {
    let count = project.malformed_lines().len();
    if count == 0 {
        project.meta.unset("parse-errors");
        return;
    }

    project.meta.set("Parse-Errors", vec!["-"; count].join("\n"));
    project.separate_regions();

    let errors: Vec<String> = project
        .malformed_lines()
        .into_iter()
        .map(|(line, reason)| format!("line {}: {}", line, reason))
        .collect();
    project.meta.set("Parse-Errors", errors.join("\n"));
}

/// Builds a new entry for `date` the way a user would have typed it
pub(crate) fn new_entry(
    options: &AnnotateOptions,
    project: &Project,
    date: NaiveDate,
    times: Option<(NaiveTime, Option<NaiveTime>)>,
) -> LogEntry {
    let lang = project.lang();
    let date_expr = format_datetime(&options.date_format, date.and_time(NaiveTime::MIN), &lang);

    let trange = times.map(|(start, end)| {
        let mut text = format!("{}-", format_datetime(&options.time_format, date.and_time(start), &lang));
        if let Some(end) = end {
            text.push_str(&format_datetime(&options.time_format, date.and_time(end), &lang));
        }
        (text, start, end)
    });

    LogEntry::new(date_expr, date, trange)
}

/// Inserts `item` at `index`, preceded by a year reference if the year in
/// effect there is not the item's year
pub(crate) fn insert_dated(project: &mut Project, index: usize, item: LogItem, date: NaiveDate) {
    let running = project.log.items[..index]
        .iter()
        .rev()
        .find_map(LogItem::reference_date)
        .map(|d| d.year());

    let mut at = index;
    if running != Some(date.year()) {
        project
            .log
            .items
            .insert(at, LogItem::Reference(TimeReference::year(date)));
        at += 1;
    }
    project.log.items.insert(at, item);
}
