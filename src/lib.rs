//! worklog - plain-text work logs
//!
//! A project file holds a metadata header, a dated work log and free text
//! with task lines. An annotate pass fills in durations, expands shorthand
//! lines into entries, lists commits under marked entries and syncs task
//! lines with a task tracker, then writes the file back.

pub mod annotate;
pub mod cli;
pub mod domain;
pub mod external;
pub mod storage;

pub use annotate::{AnnotateOptions, AnnotateReport, Annotator, Clock, Step};
pub use domain::{Diagnostic, Project};
