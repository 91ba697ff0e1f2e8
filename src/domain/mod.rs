//! Domain models for worklog
//!
//! Parsing and the project model, without any I/O concerns.

mod body;
mod date;
mod diagnostic;
mod duration;
mod lang;
mod log;
mod meta;
mod project;

pub use body::{Body, TaskLine, TaskMarker, TASK_ATTRIBUTES};
pub use date::{format_datetime, DateContext, DateError, DateExpr, Granularity, Resolver};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use duration::{format_duration, format_duration_tabular};
pub use lang::{Lang, ENGLISH, FRENCH, GERMAN, ITALIAN, SPANISH};
pub use log::{
    is_log_start, parse_time, Command, CommandKind, Durations, Log, LogEntry, LogItem, LogParser,
    MalformedEntry, ParsedLog, TimeReference,
};
pub use meta::{MetaField, Metadata};
pub use project::{Project, ProjectSummary};
