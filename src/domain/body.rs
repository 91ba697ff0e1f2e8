//! Free text after the log, and the task lines in it
//!
//! Body lines are kept verbatim. A line of the form `t [text]` is a new task
//! to create in the tracker; `t14 [text]` is a task the tracker knows as
//! number 14.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static TASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)t(?P<id>\d*)\s+(?P<text>.+)$").expect("task regex")
});

static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<key>[^:]+):(?P<val>[^:]+)$").expect("attribute regex"));

/// Attribute keys passed to the tracker when a task is created
pub const TASK_ATTRIBUTES: [&str; 6] = ["start", "due", "until", "wait", "scheduled", "priority"];

/// Task marker state as written in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMarker {
    /// `t text`: not yet in the tracker
    New,
    /// `t14 text`
    Tracked(u32),
}

/// A task line found in the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    /// Index of the line in the body
    pub index: usize,
    pub indent: String,
    pub marker: TaskMarker,
    pub description: String,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

impl TaskLine {
    /// Reads a task line
    pub fn parse(index: usize, line: &str) -> Option<Self> {
        let caps = TASK_RE.captures(line)?;

        let marker = match &caps["id"] {
            "" => TaskMarker::New,
            id => TaskMarker::Tracked(id.parse().ok()?),
        };

        let mut description = Vec::new();
        let mut tags = Vec::new();
        let mut attributes = BTreeMap::new();

        for word in caps["text"].split_whitespace() {
            if let Some(tag) = word.strip_prefix('+').filter(|t| !t.is_empty()) {
                if !tags.iter().any(|t: &String| t == tag) {
                    tags.push(tag.to_string());
                }
                continue;
            }

            let attribute = ATTRIBUTE_RE
                .captures(word)
                .filter(|a| TASK_ATTRIBUTES.contains(&&a["key"]));
            match attribute {
                Some(a) => {
                    attributes.insert(a["key"].to_string(), a["val"].to_string());
                }
                None => description.push(word),
            }
        }

        Some(Self {
            index,
            indent: caps["indent"].to_string(),
            marker,
            description: description.join(" "),
            tags,
            attributes,
        })
    }

    /// Numeric tracker id, if tracked
    pub fn id(&self) -> Option<u32> {
        match self.marker {
            TaskMarker::New => None,
            TaskMarker::Tracked(id) => Some(id),
        }
    }

    /// Renders the line; project tags are left implicit
    pub fn render(&self, hidden_tags: &[String]) -> String {
        let mut parts = vec![match self.marker {
            TaskMarker::New => "t".to_string(),
            TaskMarker::Tracked(id) => format!("t{}", id),
        }];
        if !self.description.is_empty() {
            parts.push(self.description.clone());
        }
        parts.extend(
            self.tags
                .iter()
                .filter(|t| !hidden_tags.contains(t))
                .map(|t| format!("+{}", t)),
        );
        if self.marker == TaskMarker::New {
            parts.extend(self.attributes.iter().map(|(k, v)| format!("{}:{}", k, v)));
        }
        format!("{}{}", self.indent, parts.join(" "))
    }
}

/// Free text region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub lines: Vec<String>,
}

impl Body {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Scans for task lines, in order
    pub fn tasks(&self) -> Vec<TaskLine> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| TaskLine::parse(idx, line))
            .collect()
    }

    /// Replaces the line at `index`
    pub fn replace(&mut self, index: usize, line: String) -> bool {
        match self.lines.get_mut(index) {
            Some(slot) if *slot != line => {
                *slot = line;
                true
            }
            _ => false,
        }
    }

    /// Removes lines by index
    pub fn remove(&mut self, indices: &[usize]) {
        let mut idx = 0;
        self.lines.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
    }

    pub fn render(&self, out: &mut Vec<String>) {
        out.extend(self.lines.iter().cloned());
    }
}
