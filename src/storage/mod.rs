//! # Storage Layer
//!
//! Persistence for worklog. Everything is plain files.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Projects | Plain text | wherever the user keeps them |
//! | Id mappings | JSON | `<data dir>/project-<name>.json` |
//! | Config | TOML | `<config dir>/config.toml` |
//!
//! All writes are atomic (temp file + rename). There is no locking: one
//! process works on a given project at a time.

mod config;
mod project_file;
mod sidecar;

pub use config::{Config, ConfigError, OutputFormat, CONFIG_ENV, DATA_DIR_ENV};
pub use project_file::{read_text, ProjectFile, ProjectFileError};
pub use sidecar::{IdMap, JsonSidecarStore, MemorySidecarStore, SidecarError, SidecarStore};
