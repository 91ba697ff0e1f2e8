//! Recoverable problems found while parsing or annotating
//!
//! Nothing here aborts a pass: diagnostics are collected on the project and
//! reported as warnings once the file has been written.

use std::fmt;

use serde::Serialize;

/// Category of a recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A log line that could not be parsed; kept verbatim
    Parse,
    /// The task tracker failed or did not know a task
    Tracker,
    /// The commit history could not be read
    History,
    /// Input accepted with an interpretation the user should know about
    Notice,
}

/// A recoverable problem attached to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line in the source file, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    pub kind: DiagnosticKind,

    pub message: String,
}

impl Diagnostic {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            kind: DiagnosticKind::Parse,
            message: message.into(),
        }
    }

    pub fn tracker(message: impl Into<String>) -> Self {
        Self {
            line: None,
            kind: DiagnosticKind::Tracker,
            message: message.into(),
        }
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self {
            line: None,
            kind: DiagnosticKind::History,
            message: message.into(),
        }
    }

    pub fn notice(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Notice,
            message: message.into(),
        }
    }

    pub fn is_parse_error(&self) -> bool {
        self.kind == DiagnosticKind::Parse
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
