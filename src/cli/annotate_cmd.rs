//! `worklog annotate`

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::output::Output;
use crate::annotate::{AnnotateOptions, AnnotateReport, Annotator, Clock, Step};
use crate::domain::Project;
use crate::external::{GitCommitLog, TaskwarriorTracker};
use crate::storage::{read_text, Config, JsonSidecarStore, ProjectFile, SidecarStore};

/// Command-line switches of `annotate`
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub file: Option<PathBuf>,
    pub tracker: bool,
    pub history: bool,
    pub dry_run: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    path: Option<String>,
    changed: bool,
    #[serde(flatten)]
    report: &'a AnnotateReport,
}

pub fn run(output: &Output, config: &Config, clock: Clock, flags: Flags) -> Result<()> {
    let file = flags.file.as_deref().map(ProjectFile::new);
    let text = match &file {
        Some(file) => file.read()?,
        None => read_text(io::stdin().lock())?,
    };

    let lang = config.lang()?;
    let mut project = Project::parse(&text, clock.today(), lang);
    if let Some(path) = &flags.file {
        project = project.with_path(path);
    }

    let options = AnnotateOptions {
        date_format: config.date_format.clone(),
        time_format: config.time_format.clone(),
        author: config.author.clone(),
        autotag: config.autotag_rules()?,
    };

    let planned = Annotator::new(clock, options.clone()).plan(&project);
    output.verbose_ctx("annotate", &format!("{} planned steps", planned.len()));

    let commits = (flags.history && planned.contains(&Step::HistoryFill))
        .then(|| GitCommitLog::new(repo_dir(flags.file.as_deref()), config.git_timeout()));
    // A dry run must not create tasks it would then forget
    let mut tracker = (flags.tracker && !flags.dry_run && !project.body.tasks().is_empty())
        .then(|| TaskwarriorTracker::new(&config.tracker_command, config.tracker_timeout()));
    let sidecar = match Config::data_dir() {
        Some(dir) => Some(JsonSidecarStore::new(dir)),
        None => {
            output.verbose("no data directory, task ids are not remembered");
            None
        }
    };

    let mut options = options;
    if options.author.is_none() {
        if let Some(commits) = &commits {
            match commits.default_author() {
                Ok(author) => options.author = Some(author),
                Err(e) => output.verbose_ctx("history", &format!("no commit author: {}", e)),
            }
        }
    }

    let mut annotator = Annotator::new(clock, options);
    if let Some(tracker) = tracker.as_mut() {
        annotator = annotator.with_tracker(tracker);
    }
    if let Some(commits) = &commits {
        annotator = annotator.with_commits(commits);
    }
    if let Some(sidecar) = &sidecar {
        annotator = annotator.with_sidecar(sidecar);
    }

    let report = annotator.annotate(&mut project);
    for diagnostic in &report.diagnostics {
        output.warning(diagnostic);
    }

    let rendered = project.render();
    match file {
        Some(file) if !flags.dry_run => {
            let changed = file
                .save(&rendered)
                .with_context(|| format!("Failed to save {}", file.path().display()))?;
            output.verbose_ctx(
                "annotate",
                &format!("{} {}", file.path().display(), if changed { "rewritten" } else { "unchanged" }),
            );
            save_task_ids(sidecar.as_ref(), &project, &report)?;
            output.data(&Summary {
                path: Some(file.path().display().to_string()),
                changed,
                report: &report,
            });
        }
        Some(_) => output.text(&rendered),
        None => {
            output.text(&rendered);
            save_task_ids(sidecar.as_ref(), &project, &report)?;
        }
    }

    Ok(())
}

/// Saves the id mapping of a pass once its output is out
fn save_task_ids(sidecar: Option<&JsonSidecarStore>, project: &Project, report: &AnnotateReport) -> Result<()> {
    let (Some(store), Some(ids)) = (sidecar, &report.task_ids) else {
        return Ok(());
    };
    store
        .save(&project.name(), ids)
        .with_context(|| format!("Failed to save task ids of {}", project.name()))
}

/// Directory whose repository history belongs to the project
fn repo_dir(file: Option<&Path>) -> PathBuf {
    file.and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_dir_of_project_file() {
        assert_eq!(repo_dir(Some(Path::new("/work/site/notes.txt"))), PathBuf::from("/work/site"));
        assert_eq!(repo_dir(Some(Path::new("notes.txt"))), PathBuf::from("."));
        assert_eq!(repo_dir(None), PathBuf::from("."));
    }
}
