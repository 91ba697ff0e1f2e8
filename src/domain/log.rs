//! Work log parsing
//!
//! The log is the block of dated entries between the metadata and the free
//! text. It ends at the first blank line. Items are:
//!
//! - time references (`2016`, `--- march 2016`) that move the date context,
//! - entries (`15 march: 9:00-12:00 3h +tag`) followed by body lines,
//! - commands (`10:00`, `10:00-12:00 +tag`, `+`, `++`) waiting to be
//!   expanded into entries by an annotate pass,
//! - malformed headers, kept verbatim.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::debug;

use super::date::{DateContext, Granularity, Resolver};
use super::diagnostic::Diagnostic;
use super::duration::format_duration;

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<year>\d{4})|-+\s*(?P<date>.+?))\s*$").expect("reference regex")
});

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<date>(?:\S| \d)[^:]*):\s*",
        r"(?P<trange>(?P<start>\d+:\d+)\s*-\s*(?P<end>\d+:\d+)?)?\s*",
        r"(?P<notes>(?:(?:\+\S+|\[[^\]]+\]|\d+[a-z]+)\s*)*)$",
    ))
    .expect("entry regex")
});

/// Anything shaped like `<date>:`, checked once the full grammar failed
static HEADER_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<date>\S[^:]*):").expect("header-like regex"));

static COMMAND_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<start>\d+:\d+)\s*(?:-\s*(?P<end>\d+:\d+)?\s*)?",
        r"(?P<notes>(?:(?:\+[^\s+]\S*|\[[^\]]+\]|\d+[a-z]+)\s*)*)",
        r"(?P<fill>\+)?\s*$",
    ))
    .expect("command regex")
});

static COMMAND_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+(?P<fill>\+)?\s*$").expect("day command regex"));

static NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+\S+|\[[^\]]+\]|\d+[a-z]+").expect("note regex"));

/// Checks whether a line opens a log block
///
/// Only time references and entry headers whose date is readable in the
/// resolver's language count: `Total: 3h` is a metadata field, not a log.
pub fn is_log_start(line: &str, resolver: &Resolver) -> bool {
    if let Some(caps) = REFERENCE_RE.captures(line) {
        match caps.name("date") {
            Some(date) => {
                if resolver.is_date(date.as_str()) {
                    return true;
                }
            }
            None => return true,
        }
    }

    ENTRY_RE
        .captures(line)
        .is_some_and(|caps| resolver.is_date(&caps["date"]) && times_valid(&caps))
}

/// Parses `h:mm`
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let (h, m) = text.trim().split_once(':')?;
    if m.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, 0)
}

fn times_valid(caps: &regex::Captures<'_>) -> bool {
    ["start", "end"]
        .iter()
        .all(|name| caps.name(name).is_none_or(|m| parse_time(m.as_str()).is_some()))
}

/// A line setting the date context for the entries after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeReference {
    pub line: String,
    pub date: NaiveDate,
    pub granularity: Granularity,
    /// 1-based source line, `None` when created by annotate
    pub source_line: Option<usize>,
}

impl TimeReference {
    /// A year-only reference, as written by annotate
    pub fn year(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            line: date.year().to_string(),
            date: NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
            granularity: Granularity::Year,
            source_line: None,
        }
    }
}

/// A dated log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    head: String,
    date_expr: String,
    trange: Option<String>,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub tags: Vec<String>,
    /// `[project]` notes, kept as written
    pub projects: Vec<String>,
    pub body: Vec<String>,
    pub source_line: Option<usize>,
}

impl LogEntry {
    /// Builds a new entry from a formatted date and time range
    ///
    /// `date_expr` must resolve back to `date` when re-read.
    pub fn new(
        date_expr: impl Into<String>,
        date: NaiveDate,
        trange: Option<(String, NaiveTime, Option<NaiveTime>)>,
    ) -> Self {
        let (trange, start, end) = match trange {
            Some((text, start, end)) => (Some(text), Some(start), end),
            None => (None, None, None),
        };

        let mut entry = Self {
            head: String::new(),
            date_expr: date_expr.into(),
            trange,
            date,
            start,
            end,
            tags: Vec::new(),
            projects: Vec::new(),
            body: Vec::new(),
            source_line: None,
        };
        entry.head = entry.render_head();
        entry
    }

    /// Header line as it currently reads
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Entry spans the whole day
    pub fn is_full_day(&self) -> bool {
        self.start.is_none()
    }

    /// Entry has a start and no end yet
    pub fn is_open(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    /// End time earlier than start time, read as ending the next day
    pub fn crosses_midnight(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if e < s)
    }

    /// Beginning of the entry's timespan
    pub fn begin(&self) -> NaiveDateTime {
        self.date.and_time(self.start.unwrap_or(NaiveTime::MIN))
    }

    /// End of the timespan, `None` while open
    pub fn until(&self) -> Option<NaiveDateTime> {
        match (self.start, self.end) {
            (None, _) => self.date.checked_add_days(Days::new(1)).map(|d| d.and_time(NaiveTime::MIN)),
            (Some(_), None) => None,
            (Some(_), Some(end)) => {
                let date = if self.crosses_midnight() {
                    self.date.checked_add_days(Days::new(1))?
                } else {
                    self.date
                };
                Some(date.and_time(end))
            }
        }
    }

    /// Worked minutes; open entries count up to `now`
    ///
    /// Full-day entries mark a date without accruing time.
    pub fn duration(&self, now: NaiveDateTime) -> i64 {
        if self.is_full_day() {
            return 0;
        }
        let until = self.until().unwrap_or(now);
        (until - self.begin()).num_minutes().max(0)
    }

    /// Adds a tag unless already present
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Renders the header with the computed duration
    ///
    /// The duration of open and full-day entries is never written.
    pub fn render_head(&self) -> String {
        let mut parts = vec![format!("{}:", self.date_expr)];
        if let Some(trange) = &self.trange {
            parts.push(trange.clone());
            if self.end.is_some() {
                // Closed entries do not depend on the clock
                parts.push(format_duration(self.duration(NaiveDateTime::MIN)));
            }
        }
        parts.extend(self.tags.iter().map(|t| format!("+{}", t)));
        parts.extend(self.projects.iter().cloned());
        parts.join(" ")
    }

    /// Rewrites the header from the parsed values; true if it changed
    pub fn refresh_head(&mut self) -> bool {
        let head = self.render_head();
        if head == self.head {
            return false;
        }
        self.head = head;
        true
    }
}

/// Shape of an annotate command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `+`: a full-day entry for today
    Day,
    /// `10:00`, `10:00-`, `10:00-12:00`: a timed entry for today
    Time {
        start: NaiveTime,
        end: Option<NaiveTime>,
    },
}

/// A shorthand line waiting to become an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub head: String,
    pub kind: CommandKind,
    pub tags: Vec<String>,
    /// Trailing `+`: fill the new entry from commit history
    pub fill: bool,
    pub body: Vec<String>,
    pub source_line: Option<usize>,
}

/// A header line that could not be read, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub head: String,
    pub body: Vec<String>,
    pub reason: String,
    pub source_line: Option<usize>,
}

/// One item of the log, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogItem {
    Reference(TimeReference),
    Entry(LogEntry),
    Command(Command),
    Malformed(MalformedEntry),
}

impl LogItem {
    /// Date this item sets as context for the next ones
    pub fn reference_date(&self) -> Option<NaiveDate> {
        match self {
            LogItem::Reference(r) => Some(r.date),
            LogItem::Entry(e) => Some(e.date),
            LogItem::Command(_) | LogItem::Malformed(_) => None,
        }
    }

    /// Number of file lines the item takes
    pub fn line_count(&self) -> usize {
        match self {
            LogItem::Reference(_) => 1,
            LogItem::Entry(e) => 1 + e.body.len(),
            LogItem::Command(c) => 1 + c.body.len(),
            LogItem::Malformed(m) => 1 + m.body.len(),
        }
    }

    fn body_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            LogItem::Reference(_) => None,
            LogItem::Entry(e) => Some(&mut e.body),
            LogItem::Command(c) => Some(&mut c.body),
            LogItem::Malformed(m) => Some(&mut m.body),
        }
    }

    fn render(&self, out: &mut Vec<String>) {
        match self {
            LogItem::Reference(r) => out.push(r.line.clone()),
            LogItem::Entry(e) => {
                out.push(e.head.clone());
                out.extend(e.body.iter().cloned());
            }
            LogItem::Command(c) => {
                out.push(c.head.clone());
                out.extend(c.body.iter().cloned());
            }
            LogItem::Malformed(m) => {
                out.push(m.head.clone());
                out.extend(m.body.iter().cloned());
            }
        }
    }
}

/// Worked time, in minutes, overall and per tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Durations {
    pub total: i64,
    pub by_tag: BTreeMap<String, i64>,
}

/// The parsed log block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    pub items: Vec<LogItem>,
}

impl Log {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over dated entries
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.items.iter().filter_map(|item| match item {
            LogItem::Entry(e) => Some(e),
            _ => None,
        })
    }

    /// Iterates mutably over dated entries
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut LogEntry> {
        self.items.iter_mut().filter_map(|item| match item {
            LogItem::Entry(e) => Some(e),
            _ => None,
        })
    }

    pub fn first_entry(&self) -> Option<&LogEntry> {
        self.entries().next()
    }

    pub fn last_entry(&self) -> Option<&LogEntry> {
        self.entries().last()
    }

    /// Pending commands
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.items.iter().filter_map(|item| match item {
            LogItem::Command(c) => Some(c),
            _ => None,
        })
    }

    /// Date of the last item that sets context
    pub fn last_reference_date(&self) -> Option<NaiveDate> {
        self.items.iter().rev().find_map(LogItem::reference_date)
    }

    /// Sums entry durations, overall and per tag
    pub fn durations(&self, now: NaiveDateTime) -> Durations {
        let mut out = Durations::default();
        for entry in self.entries() {
            let minutes = entry.duration(now);
            out.total += minutes;
            for tag in &entry.tags {
                *out.by_tag.entry(tag.clone()).or_default() += minutes;
            }
        }
        out
    }

    /// Appends the log lines to `out`
    pub fn render(&self, out: &mut Vec<String>) {
        for item in &self.items {
            item.render(out);
        }
    }
}

/// Result of reading a log block
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub log: Log,
    /// Number of source lines belonging to the log
    pub consumed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads a log block, threading the date context from item to item
pub struct LogParser {
    resolver: Resolver,
    ctx: DateContext,
    diagnostics: Vec<Diagnostic>,
}

impl LogParser {
    pub fn new(resolver: Resolver, ctx: DateContext) -> Self {
        Self {
            resolver,
            ctx,
            diagnostics: Vec::new(),
        }
    }

    /// Parses lines up to the first blank line
    ///
    /// `first_line` is the 1-based file line of `lines[0]`, used in
    /// diagnostics.
    pub fn parse(mut self, lines: &[String], first_line: usize) -> ParsedLog {
        let mut log = Log::default();
        let mut consumed = 0;

        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                break;
            }
            consumed += 1;
            let lineno = first_line + idx;

            if let Some(item) = self.parse_head(line, lineno) {
                debug!(line = lineno, "log item: {}", line);
                log.items.push(item);
                continue;
            }

            match log.items.last_mut().and_then(LogItem::body_mut) {
                Some(body) => body.push(line.clone()),
                None => {
                    // Body text right after a reference has no entry to attach to
                    let item = self.malformed(line, lineno, format!("line outside of any entry: {:?}", line));
                    log.items.push(item);
                }
            }
        }

        ParsedLog {
            log,
            consumed,
            diagnostics: self.diagnostics,
        }
    }

    /// Reads a line that starts a new item, if it is one
    fn parse_head(&mut self, line: &str, lineno: usize) -> Option<LogItem> {
        if line.starts_with([' ', '\t']) {
            return None;
        }

        if let Some(caps) = REFERENCE_RE.captures(line) {
            let expr = caps
                .name("year")
                .or_else(|| caps.name("date"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if let Ok((date, granularity, ctx)) = self.resolver.resolve_reference(expr, self.ctx) {
                self.ctx = ctx;
                return Some(LogItem::Reference(TimeReference {
                    line: line.to_string(),
                    date,
                    granularity,
                    source_line: Some(lineno),
                }));
            }
        }

        if let Some(caps) = ENTRY_RE.captures(line) {
            return Some(self.parse_entry(line, &caps, lineno));
        }

        if let Some(command) = self.parse_command(line, lineno) {
            return Some(command);
        }

        // A dated line the grammar rejects would otherwise vanish into the
        // previous entry's body, hours included
        let caps = HEADER_LIKE_RE.captures(line)?;
        if !self.resolver.is_date(caps["date"].trim()) {
            return None;
        }
        Some(self.malformed(line, lineno, format!("unrecognised log header {:?}", line)))
    }

    fn parse_entry(&mut self, line: &str, caps: &regex::Captures<'_>, lineno: usize) -> LogItem {
        let date_expr = &caps["date"];
        let date = match self.resolver.resolve(date_expr, self.ctx) {
            Ok((date, ctx)) => {
                self.ctx = ctx;
                date
            }
            Err(err) => {
                return self.malformed(
                    line,
                    lineno,
                    format!(
                        "cannot parse log header date {:?} (lang={}): {}",
                        date_expr,
                        self.resolver.lang().code(),
                        err
                    ),
                )
            }
        };

        let start = caps.name("start").map(|m| (m.as_str(), parse_time(m.as_str())));
        let end = caps.name("end").map(|m| (m.as_str(), parse_time(m.as_str())));
        let (start, end) = match (start, end) {
            (Some((_, None)), _) | (_, Some((_, None))) => {
                return self.malformed(line, lineno, format!("invalid time in {:?}", line));
            }
            (start, end) => (start.and_then(|s| s.1), end.and_then(|e| e.1)),
        };

        let (tags, projects) = split_notes(caps.name("notes").map_or("", |m| m.as_str()));

        let entry = LogEntry {
            head: line.to_string(),
            date_expr: date_expr.to_string(),
            trange: caps.name("trange").map(|m| m.as_str().to_string()),
            date,
            start,
            end,
            tags,
            projects,
            body: Vec::new(),
            source_line: Some(lineno),
        };

        if entry.crosses_midnight() {
            self.diagnostics.push(Diagnostic::notice(
                Some(lineno),
                "end time before start time, counted as ending the next day",
            ));
        }

        LogItem::Entry(entry)
    }

    fn parse_command(&mut self, line: &str, lineno: usize) -> Option<LogItem> {
        if let Some(caps) = COMMAND_DAY_RE.captures(line) {
            return Some(LogItem::Command(Command {
                head: line.to_string(),
                kind: CommandKind::Day,
                tags: Vec::new(),
                fill: caps.name("fill").is_some(),
                body: Vec::new(),
                source_line: Some(lineno),
            }));
        }

        let caps = COMMAND_TIME_RE.captures(line)?;
        let start = parse_time(&caps["start"]);
        let end = caps.name("end").map(|m| parse_time(m.as_str()));
        let (start, end) = match (start, end) {
            (Some(start), None) => (start, None),
            (Some(start), Some(Some(end))) => (start, Some(end)),
            _ => return Some(self.malformed(line, lineno, format!("invalid time in {:?}", line))),
        };

        let (tags, _) = split_notes(caps.name("notes").map_or("", |m| m.as_str()));

        Some(LogItem::Command(Command {
            head: line.to_string(),
            kind: CommandKind::Time { start, end },
            tags,
            fill: caps.name("fill").is_some(),
            body: Vec::new(),
            source_line: Some(lineno),
        }))
    }

    fn malformed(&mut self, line: &str, lineno: usize, reason: String) -> LogItem {
        self.diagnostics.push(Diagnostic::parse(lineno, reason.clone()));
        LogItem::Malformed(MalformedEntry {
            head: line.to_string(),
            body: Vec::new(),
            reason,
            source_line: Some(lineno),
        })
    }
}

/// Splits header notes into tags and `[project]` notes; durations are dropped
fn split_notes(notes: &str) -> (Vec<String>, Vec<String>) {
    let mut tags: Vec<String> = Vec::new();
    let mut projects = Vec::new();

    for note in NOTE_RE.find_iter(notes).map(|m| m.as_str()) {
        if let Some(tag) = note.strip_prefix('+') {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        } else if note.starts_with('[') {
            projects.push(note.to_string());
        }
    }

    (tags, projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lang::{ENGLISH, ITALIAN};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn parse(text: &str) -> ParsedLog {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        LogParser::new(Resolver::new(ENGLISH), DateContext::start_of_year(2016)).parse(&lines, 1)
    }

    fn entries(parsed: &ParsedLog) -> Vec<&LogEntry> {
        parsed.log.entries().collect()
    }

    #[test]
    fn log_start_detection() {
        let resolver = Resolver::new(ENGLISH);
        assert!(is_log_start("2016", &resolver));
        assert!(is_log_start("--- march 2016", &resolver));
        assert!(is_log_start("15 march: 9:00-12:00", &resolver));
        assert!(is_log_start("15 march:", &resolver));
        assert!(!is_log_start("Total: 3h", &resolver));
        assert!(!is_log_start("Name: test", &resolver));
        assert!(!is_log_start("15 march: 25:00-26:00", &resolver));
        assert!(!is_log_start("01 marzo:", &resolver));
        assert!(is_log_start("01 marzo:", &Resolver::new(ITALIAN)));
    }

    #[test]
    fn parses_entries_with_bodies() {
        let parsed = parse("2016\n15 march: 9:00-12:00 3h +tag\n - work\n - more\n16 march:\n - day off\n");
        let entries = entries(&parsed);

        assert_eq!(parsed.consumed, 6);
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, ymd(2016, 3, 15));
        assert_eq!(entries[0].start, Some(hm(9, 0)));
        assert_eq!(entries[0].end, Some(hm(12, 0)));
        assert_eq!(entries[0].tags, vec!["tag"]);
        assert_eq!(entries[0].body, vec![" - work", " - more"]);
        assert!(entries[1].is_full_day());
    }

    #[test]
    fn stops_at_blank_line() {
        let parsed = parse("2016\n15 march: 9:00-10:00\n\nfree text\n");
        assert_eq!(parsed.consumed, 2);
    }

    #[test]
    fn partial_dates_follow_previous_entry() {
        let parsed = parse("2012\n28 june: 9:00-10:00\njune 29: 15:45-16:30\n");
        let entries = entries(&parsed);
        assert_eq!(entries[1].date, ymd(2012, 6, 29));
    }

    #[test]
    fn reference_moves_context() {
        let parsed = parse("2015\n1 march:\n--- june 2016\n3:\n");
        let entries = entries(&parsed);
        assert_eq!(entries[0].date, ymd(2015, 3, 1));
        assert_eq!(entries[1].date, ymd(2016, 6, 3));
    }

    #[test]
    fn duration_of_closed_and_open_entries() {
        let parsed = parse("2016\n15 march: 10:00-11:30\n16 march: 10:00-\n");
        let entries = entries(&parsed);
        let now = ymd(2016, 3, 16).and_hms_opt(10, 45, 0).unwrap();

        assert_eq!(format_duration(entries[0].duration(now)), "1h30m");
        assert!(entries[1].is_open());
        assert_eq!(format_duration(entries[1].duration(now)), "45m");
    }

    #[test]
    fn midnight_crossing_is_next_day() {
        let parsed = parse("2016\n15 march: 22:00-01:30\n");
        let entry = entries(&parsed)[0].clone();

        assert!(entry.crosses_midnight());
        assert_eq!(entry.duration(NaiveDateTime::MIN), 210);
        assert_eq!(entry.until(), Some(ymd(2016, 3, 16).and_hms_opt(1, 30, 0).unwrap()));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(!parsed.diagnostics[0].is_parse_error());
    }

    #[test]
    fn unreadable_date_is_kept_verbatim() {
        let parsed = parse("2016\n15 march: 9:00-10:00\n15 pippo: 10:00-11:00\n - body\n16 march:\n");

        assert_eq!(parsed.consumed, 5);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, Some(3));
        match &parsed.log.items[2] {
            LogItem::Malformed(m) => {
                assert_eq!(m.head, "15 pippo: 10:00-11:00");
                assert_eq!(m.body, vec![" - body"]);
            }
            other => panic!("unexpected item {:?}", other),
        }

        let mut out = Vec::new();
        parsed.log.render(&mut out);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn dated_line_with_free_text_notes_is_reported() {
        let parsed = parse("2016\n15 march: 9:00-10:00\n16 march: 9:00-17:00 meeting with bob\n - agenda\n");

        assert_eq!(entries(&parsed).len(), 1);
        assert!(entries(&parsed)[0].body.is_empty());
        assert_eq!(parsed.log.durations(NaiveDateTime::MIN).total, 60);

        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].is_parse_error());
        assert_eq!(parsed.diagnostics[0].line, Some(3));
        match &parsed.log.items[2] {
            LogItem::Malformed(m) => {
                assert_eq!(m.head, "16 march: 9:00-17:00 meeting with bob");
                assert_eq!(m.body, vec![" - agenda"]);
                assert!(m.reason.starts_with("unrecognised log header"));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn undated_text_stays_in_the_body() {
        let parsed = parse("2016\n15 march: 9:00-10:00\nNote: bring slides\n");

        assert!(parsed.diagnostics.is_empty());
        assert_eq!(entries(&parsed)[0].body, vec!["Note: bring slides"]);
    }

    #[test]
    fn commands() {
        let parsed = parse("2016\n15 march:\n10:00\n10:00-12:00 +tag +\n+\n++\n");
        let commands: Vec<&Command> = parsed.log.commands().collect();

        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].kind, CommandKind::Time { start: hm(10, 0), end: None });
        assert!(!commands[0].fill);
        assert_eq!(
            commands[1].kind,
            CommandKind::Time { start: hm(10, 0), end: Some(hm(12, 0)) }
        );
        assert_eq!(commands[1].tags, vec!["tag"]);
        assert!(commands[1].fill);
        assert_eq!(commands[2].kind, CommandKind::Day);
        assert!(!commands[2].fill);
        assert!(commands[3].fill);
    }

    #[test]
    fn head_rendering() {
        let parsed = parse("2016\n15 march:   10:00-11:30  +b  2h [proj]\n16 march: 9:00-\n17 march:\n");
        let mut entries: Vec<LogEntry> = parsed.log.entries().cloned().collect();

        assert_eq!(entries[0].render_head(), "15 march: 10:00-11:30 1h30m +b [proj]");
        assert_eq!(entries[1].render_head(), "16 march: 9:00-");
        assert_eq!(entries[2].render_head(), "17 march:");

        assert!(entries[0].refresh_head());
        assert!(!entries[0].refresh_head());
        assert!(!entries[1].refresh_head());
    }

    #[test]
    fn new_entry_renders_its_head() {
        let entry = LogEntry::new(
            "16 March",
            ymd(2016, 3, 16),
            Some(("10:00-".to_string(), hm(10, 0), None)),
        );
        assert_eq!(entry.head(), "16 March: 10:00-");
    }

    #[test]
    fn durations_by_tag() {
        let parsed = parse("2016\n15 march: 9:00-10:00 +a\n16 march: 9:00-11:00 +a +b\n17 march: 9:00-9:30\n");
        let durations = parsed.log.durations(NaiveDateTime::MIN);

        assert_eq!(durations.total, 210);
        assert_eq!(durations.by_tag.get("a"), Some(&180));
        assert_eq!(durations.by_tag.get("b"), Some(&120));
    }
}
