//! Project file document and model
//!
//! A project file is, in order: a metadata header, blank lines, the work
//! log, blank lines, and free text. [`Project::parse`] keeps every region
//! including the separating blank lines and the trailing newline, so
//! [`Project::render`] on an untouched project reproduces the input bytes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use super::body::Body;
use super::date::{DateContext, Resolver};
use super::diagnostic::Diagnostic;
use super::duration::format_duration;
use super::lang::Lang;
use super::log::{is_log_start, Durations, Log, LogItem, LogParser};
use super::meta::Metadata;

/// A loaded project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub meta: Metadata,
    meta_gap: Vec<String>,
    pub log: Log,
    log_gap: Vec<String>,
    pub body: Body,
    final_newline: bool,
    lang: Lang,
    path: Option<PathBuf>,
    /// Recoverable problems found while loading
    pub diagnostics: Vec<Diagnostic>,
}

impl Project {
    /// Parses project text
    ///
    /// Dates without a year before the first time reference resolve in
    /// `today`'s year. `default_lang` applies when there is no `Lang` field.
    pub fn parse(text: &str, today: NaiveDate, default_lang: Lang) -> Self {
        let (lines, final_newline) = split_lines(text);
        let mut diagnostics = Vec::new();

        let lang_for = |code: Option<&str>| {
            code.and_then(Lang::from_code).unwrap_or(default_lang)
        };

        let (meta, mut pos) = Metadata::parse_prefix(&lines, |line, code| {
            is_log_start(line, &Resolver::new(lang_for(code)))
        });
        debug!(fields = meta.len(), lines = pos, "parsed metadata");

        let lang = match meta.lang() {
            Some(code) => Lang::from_code(code).unwrap_or_else(|| {
                diagnostics.push(Diagnostic::notice(
                    None,
                    format!("unknown language {:?}, using {}", code, default_lang.code()),
                ));
                default_lang
            }),
            None => default_lang,
        };
        let resolver = Resolver::new(lang);

        let meta_gap = take_blank(&lines, &mut pos);

        let mut log = Log::default();
        let mut log_gap = Vec::new();
        if lines.get(pos).is_some_and(|l| is_log_start(l, &resolver)) {
            let parsed = LogParser::new(resolver, DateContext::start_of_year(today.year()))
                .parse(&lines[pos..], pos + 1);
            debug!(items = parsed.log.items.len(), first_line = pos + 1, "parsed log");
            pos += parsed.consumed;
            log = parsed.log;
            diagnostics.extend(parsed.diagnostics);
            log_gap = take_blank(&lines, &mut pos);
        }

        let body = Body::new(lines[pos..].to_vec());

        Self {
            meta,
            meta_gap,
            log,
            log_gap,
            body,
            final_newline,
            lang,
            path: None,
            diagnostics,
        }
    }

    /// Attaches the file path the project was loaded from
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Language used for log dates
    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Serializes the project back to text
    pub fn render(&self) -> String {
        let mut out = Vec::new();
        self.meta.render(&mut out);
        out.extend(self.meta_gap.iter().cloned());
        self.log.render(&mut out);
        out.extend(self.log_gap.iter().cloned());
        self.body.render(&mut out);

        let mut text = out.join("\n");
        if self.final_newline {
            text.push('\n');
        }
        text
    }

    /// Makes sure regions are separated by one blank line
    ///
    /// Only missing separators are added; existing blank lines are kept.
    pub fn separate_regions(&mut self) {
        let has_later = !self.log.is_empty() || !self.body.is_empty();
        if !self.meta.is_empty() && has_later && self.meta_gap.is_empty() {
            self.meta_gap.push(String::new());
        }
        if !self.log.is_empty() && !self.body.is_empty() && self.log_gap.is_empty() {
            self.log_gap.push(String::new());
        }
        if !self.meta.is_empty() || !self.log.is_empty() || !self.body.is_empty() {
            self.final_newline = true;
        }
    }

    /// Project name: `Name` field, else derived from the file path
    ///
    /// A file called `.egt` takes the name of its directory.
    pub fn name(&self) -> String {
        if let Some(name) = self.meta.name() {
            return name.to_string();
        }

        let Some(path) = &self.path else {
            return "project".to_string();
        };

        let from_dir = path.file_name().is_some_and(|f| f == ".egt");
        let name = if from_dir {
            path.parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        } else {
            path.file_stem().map(|s| s.to_string_lossy().into_owned())
        };

        name.filter(|n| !n.is_empty())
            .unwrap_or_else(|| "project".to_string())
    }

    /// Project tags from the `Tags` field
    pub fn tags(&self) -> BTreeSet<String> {
        self.meta.tags()
    }

    pub fn archived(&self) -> bool {
        self.meta.archived()
    }

    /// Worked minutes across all entries
    pub fn elapsed(&self, now: NaiveDateTime) -> i64 {
        self.log.durations(now).total
    }

    /// Worked minutes, overall and per tag
    pub fn durations(&self, now: NaiveDateTime) -> Durations {
        self.log.durations(now)
    }

    /// Begin and end dates of the project
    ///
    /// `Start-Date`/`End-Date` win; otherwise the first and last entries,
    /// otherwise today.
    pub fn formal_period(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let since = self
            .meta
            .start_date()
            .or_else(|| self.log.first_entry().map(|e| e.date))
            .unwrap_or(today);

        let until = self
            .meta
            .end_date()
            .or_else(|| {
                self.log
                    .last_entry()
                    .map(|e| e.until().map(|u| u.date()).unwrap_or(today))
            })
            .unwrap_or(today);

        (since, until)
    }

    /// When work on the project was last logged
    pub fn last_updated(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.log.last_entry().map(|e| e.until().unwrap_or(now))
    }

    /// Recoverable parse failures
    pub fn parse_errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_parse_error())
    }

    /// Unparsable log items as `(line, reason)`, numbered as in [`Project::render`]
    pub fn malformed_lines(&self) -> Vec<(usize, &str)> {
        let mut header = Vec::new();
        self.meta.render(&mut header);

        let mut line = header.len() + self.meta_gap.len() + 1;
        let mut found = Vec::new();
        for item in &self.log.items {
            if let LogItem::Malformed(m) = item {
                found.push((line, m.reason.as_str()));
            }
            line += item.line_count();
        }
        found
    }

    /// Summary used by reporting commands
    pub fn summary(&self, now: NaiveDateTime) -> ProjectSummary {
        let durations = self.durations(now);
        let (since, until) = self.formal_period(now.date());
        ProjectSummary {
            name: self.name(),
            path: self.path.as_ref().map(|p| p.display().to_string()),
            tags: self.tags().into_iter().collect(),
            archived: self.archived(),
            entries: self.log.entries().count(),
            elapsed: format_duration(durations.total),
            elapsed_minutes: durations.total,
            by_tag: durations
                .by_tag
                .iter()
                .map(|(tag, minutes)| (tag.clone(), format_duration(*minutes)))
                .collect(),
            since,
            until,
            last_updated: self.last_updated(now),
            tasks: self.body.tasks().len(),
            parse_errors: self.parse_errors().count(),
        }
    }
}

/// Reporting view of a project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub tags: Vec<String>,
    pub archived: bool,
    pub entries: usize,
    pub elapsed: String,
    pub elapsed_minutes: i64,
    pub by_tag: Vec<(String, String)>,
    pub since: NaiveDate,
    pub until: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDateTime>,
    pub tasks: usize,
    pub parse_errors: usize,
}

/// Splits text into lines, reporting whether it ended with a newline
fn split_lines(text: &str) -> (Vec<String>, bool) {
    if text.is_empty() {
        return (Vec::new(), false);
    }
    let final_newline = text.ends_with('\n');
    let text = text.strip_suffix('\n').unwrap_or(text);
    (text.split('\n').map(str::to_string).collect(), final_newline)
}

fn take_blank(lines: &[String], pos: &mut usize) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(line) = lines.get(*pos).filter(|l| l.trim().is_empty()) {
        out.push(line.clone());
        *pos += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lang::ENGLISH;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 3, 16).unwrap()
    }

    fn parse(text: &str) -> Project {
        Project::parse(text, today(), ENGLISH)
    }

    const SAMPLE: &str = "Name: test\nTags: a, b\n\n2016\n15 march: 9:00-12:00 3h\n - worked\n\nt1 some task\nnotes\n";

    #[test]
    fn splits_regions() {
        let project = parse(SAMPLE);

        assert_eq!(project.meta.len(), 2);
        assert_eq!(project.log.items.len(), 2);
        assert_eq!(project.body.lines, vec!["t1 some task", "notes"]);
        assert_eq!(project.name(), "test");
    }

    #[test]
    fn round_trip_is_exact() {
        for text in [
            SAMPLE,
            "",
            "\n",
            "no newline at end",
            "Name: x\n\n\n\nbody only\n\n",
            "2016\n15 march: 9:00-\n15 pippo: 10:00\n\n",
            "Name: x\r\n\r\n2016\r\n",
            "15 march: 9:00-10:00\n",
        ] {
            assert_eq!(parse(text).render(), text, "round trip of {:?}", text);
        }
    }

    #[test]
    fn file_starting_with_log_has_no_metadata() {
        let project = parse("15 march: 9:00-12:00\n - work\n");
        assert!(project.meta.is_empty());
        assert_eq!(project.log.entries().count(), 1);
    }

    #[test]
    fn total_field_is_metadata() {
        let project = parse("Total: 3h\nName: x\n\n2016\n");
        assert_eq!(project.meta.len(), 2);
        assert_eq!(project.log.items.len(), 1);
    }

    #[test]
    fn lang_field_selects_month_names() {
        let project = parse("Lang: it\n\n2019\n01 marzo: 9:00-10:00\n");
        let entry = project.log.first_entry().unwrap();
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2019, 3, 1).unwrap());
    }

    #[test]
    fn unknown_lang_is_a_notice() {
        let project = parse("Lang: klingon\n\n2019\n");
        assert_eq!(project.diagnostics.len(), 1);
        assert_eq!(project.lang(), ENGLISH);
    }

    #[test]
    fn name_from_path() {
        let project = parse("2016\n").with_path("/tmp/work/site.egt");
        assert_eq!(project.name(), "site");

        let project = parse("2016\n").with_path("/tmp/work/.egt");
        assert_eq!(project.name(), "work");
    }

    #[test]
    fn formal_period_and_elapsed() {
        let project = parse("2016\n15 march: 9:00-12:00\n16 march: 10:00-11:00\n");
        let now = today().and_hms_opt(18, 0, 0).unwrap();

        assert_eq!(
            project.formal_period(today()),
            (
                NaiveDate::from_ymd_opt(2016, 3, 15).unwrap(),
                NaiveDate::from_ymd_opt(2016, 3, 16).unwrap()
            )
        );
        assert_eq!(project.elapsed(now), 240);
        assert_eq!(
            project.last_updated(now),
            today().and_hms_opt(11, 0, 0)
        );
    }

    #[test]
    fn explicit_period_wins() {
        let project = parse("Start-Date: 2016-01-01\nEnd-Date: 2016-12-31\n\n2016\n15 march:\n");
        let (since, until) = project.formal_period(today());
        assert_eq!(since, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(until, NaiveDate::from_ymd_opt(2016, 12, 31).unwrap());
    }

    #[test]
    fn separate_regions_adds_missing_blank_lines() {
        let mut project = parse("Name: x\nfree text");
        project.separate_regions();
        assert_eq!(project.render(), "Name: x\n\nfree text\n");
    }

    #[test]
    fn malformed_lines_follow_the_rendered_file() {
        let mut project = parse("Name: x\n\n2016\n15 march: 9:00-10:00\n - note\n15 pippo:\n");
        let lines: Vec<usize> = project.malformed_lines().iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![6]);
        assert!(project.malformed_lines()[0].1.contains("pippo"));

        project.meta.set("Total", "0");
        assert_eq!(project.malformed_lines()[0].0, 7);
    }

    proptest! {
        #[test]
        fn any_text_round_trips(text in "(([A-Za-z0-9 :+\\-\\[\\]]{0,24})\n){0,12}[A-Za-z0-9 :+-]{0,12}") {
            prop_assert_eq!(parse(&text).render(), text);
        }

        #[test]
        fn log_lines_survive(lines in proptest::collection::vec("[0-9a-z :+-]{1,20}", 1..10)) {
            let text = format!("2016\n{}\n", lines.join("\n"));
            let project = parse(&text);
            let mut out = Vec::new();
            project.log.render(&mut out);
            out.extend(project.body.lines.iter().cloned());
            out.retain(|l| !l.trim().is_empty());
            let expected: Vec<String> = text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect();
            prop_assert_eq!(out, expected);
        }
    }
}
