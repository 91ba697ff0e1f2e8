//! Metadata header of a project file
//!
//! The header is a run of `Field: value` lines at the top of the file,
//! folded like mail headers: a line starting with whitespace continues the
//! previous field. Field names are case-insensitive.
//!
//! Every field remembers the lines it was read from and renders them
//! verbatim until it is modified, so unknown fields and hand formatting
//! survive a rewrite untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::duration::format_duration;

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\w[\w-]*)[ \t]*:(?P<value>.*)$").expect("field regex")
});

static TAG_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ ,\t]+").expect("tag split regex"));

/// One metadata field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaField {
    name: String,
    value: String,
    /// Source lines, dropped once the value is changed
    raw: Option<Vec<String>>,
}

impl MetaField {
    /// Field name as written
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unfolded value
    pub fn value(&self) -> &str {
        &self.value
    }

    fn key(&self) -> String {
        self.name.to_lowercase()
    }

    fn render(&self, out: &mut Vec<String>) {
        if let Some(raw) = &self.raw {
            out.extend(raw.iter().cloned());
        } else if self.value.contains('\n') {
            out.push(format!("{}:", self.name));
            out.extend(self.value.lines().map(|l| format!(" {}", l)));
        } else if self.value.is_empty() {
            out.push(format!("{}:", self.name));
        } else {
            out.push(format!("{}: {}", self.name, self.value));
        }
    }
}

/// Ordered, case-insensitive metadata mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: Vec<MetaField>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the metadata prefix of a file
    ///
    /// Stops at the first blank line or at the first line that is neither a
    /// field nor a continuation. `is_log_header` is asked about every
    /// candidate field line, together with the `Lang` read so far, so that a
    /// file starting directly with a log entry yields no metadata.
    ///
    /// Returns the metadata and the number of lines consumed.
    pub fn parse_prefix<F>(lines: &[String], is_log_header: F) -> (Self, usize)
    where
        F: Fn(&str, Option<&str>) -> bool,
    {
        let mut meta = Metadata::new();
        let mut pending: Option<(String, Vec<String>)> = None;
        let mut consumed = 0;

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                match pending.as_mut() {
                    Some((_, raw)) => raw.push(line.clone()),
                    None => break,
                }
                consumed += 1;
                continue;
            }

            let Some(caps) = FIELD_RE.captures(line) else {
                break;
            };

            if let Some((name, raw)) = pending.take() {
                meta.fields.push(fold(name, raw));
            }

            if is_log_header(line, meta.get("lang")) {
                break;
            }

            pending = Some((caps["name"].to_string(), vec![line.clone()]));
            consumed += 1;
        }

        if let Some((name, raw)) = pending {
            meta.fields.push(fold(name, raw));
        }

        (meta, consumed)
    }

    /// Returns the number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in file order
    pub fn iter(&self) -> impl Iterator<Item = &MetaField> {
        self.fields.iter()
    }

    /// Gets a field value by case-insensitive name
    ///
    /// When a field is repeated, the last occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = name.to_lowercase();
        self.fields
            .iter()
            .rev()
            .find(|f| f.key() == key)
            .map(|f| f.value.as_str())
    }

    /// Checks if a field is present
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a field value
    ///
    /// An existing field keeps its position and spelling; repeated
    /// occurrences are collapsed into the first. New fields are appended.
    /// Setting a field to its current value leaves its source lines alone.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let key = name.to_lowercase();

        match self.fields.iter().position(|f| f.key() == key) {
            Some(idx) => {
                let unchanged = self.fields[idx].value == value
                    && self.fields.iter().filter(|f| f.key() == key).count() == 1;
                if unchanged {
                    return;
                }

                self.fields[idx].value = value;
                self.fields[idx].raw = None;

                let mut seen = false;
                self.fields.retain(|f| {
                    if f.key() != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.fields.push(MetaField {
                name: name.to_string(),
                value,
                raw: None,
            }),
        }
    }

    /// Removes a field, returning true if it was present
    pub fn unset(&mut self, name: &str) -> bool {
        let key = name.to_lowercase();
        let before = self.fields.len();
        self.fields.retain(|f| f.key() != key);
        self.fields.len() != before
    }

    /// Appends the header lines to `out`
    pub fn render(&self, out: &mut Vec<String>) {
        for field in &self.fields {
            field.render(out);
        }
    }

    /// Project name
    pub fn name(&self) -> Option<&str> {
        self.get("name").filter(|n| !n.is_empty())
    }

    /// Language code for dates
    pub fn lang(&self) -> Option<&str> {
        self.get("lang").filter(|l| !l.is_empty())
    }

    /// Project tags from the `Tags` field
    pub fn tags(&self) -> BTreeSet<String> {
        self.get("tags")
            .map(|t| {
                TAG_SPLIT_RE
                    .split(t)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True for archived projects
    pub fn archived(&self) -> bool {
        self.get("archived")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "yes" | "true"))
            .unwrap_or(false)
    }

    /// Explicit start of the project period
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.date_field("start-date")
    }

    /// Explicit end of the project period
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.date_field("end-date")
    }

    fn date_field(&self, name: &str) -> Option<NaiveDate> {
        self.get(name)
            .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
    }

    /// Writes the `Total` field from computed durations
    ///
    /// `by_tag` maps tag to minutes; the untagged grand total is `total`.
    pub fn set_total(&mut self, total: i64, by_tag: &BTreeMap<String, i64>) {
        if by_tag.is_empty() {
            self.set("Total", format_duration(total));
            return;
        }

        let mut lines = vec![format!("*: {}", format_duration(total))];
        lines.extend(
            by_tag
                .iter()
                .map(|(tag, minutes)| format!("{}: {}", tag, format_duration(*minutes))),
        );
        self.set("Total", lines.join("\n"));
    }
}

/// Builds a field from its source lines, unfolding continuations
fn fold(name: String, raw: Vec<String>) -> MetaField {
    let first = raw
        .first()
        .and_then(|l| FIELD_RE.captures(l))
        .map(|c| c["value"].trim().to_string())
        .unwrap_or_default();

    let continuations = &raw[1..];
    let indent = continuations
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut parts: Vec<String> = vec![first];
    parts.extend(
        continuations
            .iter()
            .map(|l| l.get(indent..).unwrap_or(l.trim_start()).trim_end().to_string()),
    );

    let value = parts
        .into_iter()
        .skip_while(|p| p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    MetaField {
        name,
        value: value.trim_end().to_string(),
        raw: Some(raw),
    }
}
