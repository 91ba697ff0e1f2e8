//! `worklog show` and `worklog check`

use std::path::Path;

use anyhow::{bail, Result};

use super::output::Output;
use crate::annotate::Clock;
use crate::domain::{format_duration_tabular, Project};
use crate::storage::{Config, ProjectFile};

fn load(config: &Config, clock: Clock, path: &Path) -> Result<Project> {
    let project = ProjectFile::new(path).load(clock.today(), config.lang()?)?;
    Ok(project)
}

/// Prints the project summary
pub fn show(output: &Output, config: &Config, clock: Clock, path: &Path) -> Result<()> {
    let project = load(config, clock, path)?;
    let summary = project.summary(clock.now());

    if output.is_json() {
        output.data(&summary);
        return Ok(());
    }

    output.row("Name", &summary.name);
    if !summary.tags.is_empty() {
        output.row("Tags", &summary.tags.join(", "));
    }
    if summary.archived {
        output.row("Archived", "yes");
    }
    output.row("Period", &format!("{} to {}", summary.since, summary.until));
    output.row("Entries", &summary.entries.to_string());
    output.row("Elapsed", &summary.elapsed);
    for (tag, minutes) in &project.durations(clock.now()).by_tag {
        output.row(&format!("  +{}", tag), &format_duration_tabular(*minutes));
    }
    if let Some(last) = summary.last_updated {
        output.row("Last updated", &last.format("%Y-%m-%d %H:%M").to_string());
    }
    output.row("Tasks", &summary.tasks.to_string());
    if summary.parse_errors > 0 {
        output.row("Parse errors", &summary.parse_errors.to_string());
    }
    Ok(())
}

/// Lists load diagnostics; fails when the file has parse errors
pub fn check(output: &Output, config: &Config, clock: Clock, path: &Path) -> Result<()> {
    let project = load(config, clock, path)?;

    if output.is_json() {
        output.data(&project.diagnostics);
    } else {
        for diagnostic in &project.diagnostics {
            println!("{}: {}", path.display(), diagnostic);
        }
    }

    let errors = project.parse_errors().count();
    if errors > 0 {
        bail!("{}: {} parse error(s)", path.display(), errors);
    }
    output.verbose_ctx("check", &format!("{} parses cleanly", path.display()));
    Ok(())
}
