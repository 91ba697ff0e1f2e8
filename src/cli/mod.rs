//! # Command-Line Interface
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `annotate [FILE]` | Rewrite a project file, or filter stdin to stdout |
//! | `show FILE` | Project summary |
//! | `check FILE` | Parse diagnostics, non-zero exit on errors |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Warnings about recoverable problems always go to stderr.
//!
//! ## Verbose Mode
//!
//! `--verbose` (or `-v`) prints `[verbose]` lines and enables `info` logs;
//! `--debug` enables `debug` logs. `WORKLOG_LOG` takes a full filter:
//! ```bash
//! WORKLOG_LOG=worklog=debug worklog annotate notes.txt
//! ```
//!
//! Call [`run()`] to parse arguments and execute the command.

mod annotate_cmd;
mod app;
mod output;
mod report;

pub use app::{run, Cli, Commands, LOG_ENV};
pub use output::{Output, OutputFormat};
