//! Task reconciliation
//!
//! Per task line:
//!
//! - `t text`: created in the tracker, rewritten as `t<id> text`
//! - `t<id> text`, open in the tracker: id and text refreshed
//! - `t<id> text`, done or deleted: moved to a dated log entry
//! - `t<id> text`, unknown to sidecar and tracker: left alone, reported
//!
//! Every tracked line is resolved against the mapping as loaded before any
//! line is rewritten, so a renumbering never shadows the old id of a line
//! further down. The updated mapping is handed back to the caller, which
//! saves it once the project file is written.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{insert_dated, new_entry, AnnotateOptions};
use crate::domain::{Diagnostic, LogItem, Project, TaskLine, TaskMarker};
use crate::external::{NewTask, TaskInfo, TaskStatus, Tracker};
use crate::storage::{IdMap, SidecarStore};

#[derive(Debug, Default)]
pub(super) struct Outcome {
    pub created: usize,
    pub relocated: usize,
    /// Mapping to persist; None when it could not be loaded
    pub ids: Option<IdMap>,
}

struct Finished {
    index: usize,
    status: TaskStatus,
    description: String,
}

/// A tracked line together with what the tracker says about it
struct Resolved {
    task: TaskLine,
    info: TaskInfo,
}

pub(super) fn reconcile(
    project: &mut Project,
    tracker: &mut dyn Tracker,
    sidecar: Option<&dyn SidecarStore>,
    options: &AnnotateOptions,
    today: NaiveDate,
    diagnostics: &mut Vec<Diagnostic>,
) -> Outcome {
    let name = project.name();
    let mut outcome = Outcome::default();

    let mut ids = match sidecar.map(|s| s.load(&name)) {
        Some(Ok(ids)) => ids,
        Some(Err(e)) => {
            warn!("cannot load id mapping: {}", e);
            diagnostics.push(Diagnostic::tracker(format!("tasks not synced: {}", e)));
            return outcome;
        }
        None => IdMap::new(),
    };

    let project_tags: Vec<String> = project.tags().into_iter().collect();
    let tasks = project.body.tasks();

    let mut resolved = Vec::new();
    for task in tasks.iter().filter(|t| t.marker != TaskMarker::New) {
        if let Some(found) = lookup(tracker, &ids, task, diagnostics) {
            resolved.push(found);
        }
    }

    let mut finished = Vec::new();
    for Resolved { task, info } in resolved {
        if info.status == TaskStatus::Open {
            refresh(project, &mut ids, &task, &info, &project_tags);
        } else {
            debug!(id = ?task.id(), uuid = %info.uuid, status = ?info.status, "task finished");
            ids.forget(&info.uuid);
            finished.push(Finished {
                index: task.index,
                status: info.status,
                description: info.description,
            });
        }
    }

    for task in tasks.iter().filter(|t| t.marker == TaskMarker::New) {
        if create(project, tracker, &mut ids, task, &name, &project_tags, diagnostics) {
            outcome.created += 1;
        }
    }

    outcome.relocated = finished.len();
    relocate(project, finished, options, today);

    outcome.ids = Some(ids);
    outcome
}

fn create(
    project: &mut Project,
    tracker: &mut dyn Tracker,
    ids: &mut IdMap,
    task: &TaskLine,
    name: &str,
    project_tags: &[String],
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let tags: BTreeSet<String> = project_tags.iter().chain(&task.tags).cloned().collect();
    let request = NewTask {
        description: task.description.clone(),
        project: name.to_string(),
        tags: tags.into_iter().collect(),
        attributes: task.attributes.clone(),
    };

    match tracker.create(&request) {
        Ok((id, uuid)) => {
            debug!(id, %uuid, "created task");
            ids.assign(id, &uuid);
            let mut line = task.clone();
            line.marker = TaskMarker::Tracked(id);
            line.attributes.clear();
            project.body.replace(task.index, line.render(project_tags));
            true
        }
        Err(e) => {
            warn!(task = %task.description, "task creation failed: {}", e);
            diagnostics.push(Diagnostic::tracker(format!(
                "cannot create task {:?}: {}",
                task.description, e
            )));
            false
        }
    }
}

/// Finds the uuid of a tracked line and its state in the tracker
///
/// The sidecar is only read here; the tracker is asked about ids it does
/// not know.
fn lookup(
    tracker: &mut dyn Tracker,
    ids: &IdMap,
    task: &TaskLine,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Resolved> {
    let id = task.id()?;
    let uuid = match ids.uuid(id) {
        Some(uuid) => uuid.to_string(),
        None => match tracker.resolve(id) {
            Ok(Some(uuid)) => uuid,
            Ok(None) => {
                diagnostics.push(Diagnostic::tracker(format!(
                    "t{}: stale task id, left unchanged",
                    id
                )));
                return None;
            }
            Err(e) => {
                warn!(id, "tracker resolve failed: {}", e);
                diagnostics.push(Diagnostic::tracker(format!("t{}: {}", id, e)));
                return None;
            }
        },
    };

    match tracker.get_status(&uuid) {
        Ok(Some(info)) => Some(Resolved {
            task: task.clone(),
            info,
        }),
        Ok(None) => {
            diagnostics.push(Diagnostic::tracker(format!(
                "t{}: task {} not found in tracker, left unchanged",
                id, uuid
            )));
            None
        }
        Err(e) => {
            warn!(id, "tracker lookup failed: {}", e);
            diagnostics.push(Diagnostic::tracker(format!("t{}: {}", id, e)));
            None
        }
    }
}

/// Brings an open task line up to date with the tracker
fn refresh(project: &mut Project, ids: &mut IdMap, task: &TaskLine, info: &TaskInfo, project_tags: &[String]) {
    let old_id = task.id();
    let new_id = info.id.or(old_id);
    if let Some(new_id) = new_id {
        ids.assign(new_id, &info.uuid);
    }

    let visible = |tags: &[String]| -> BTreeSet<String> {
        tags.iter().filter(|t| !project_tags.contains(t)).cloned().collect()
    };

    let unchanged = new_id == old_id
        && info.description == task.description
        && visible(&info.tags) == visible(&task.tags);
    if unchanged {
        return;
    }

    let mut line = task.clone();
    if let Some(new_id) = new_id {
        line.marker = TaskMarker::Tracked(new_id);
    }
    line.description = info.description.clone();
    line.tags = info.tags.clone();
    debug!(from = ?old_id, to = ?new_id, "refreshed task line");
    project.body.replace(task.index, line.render(project_tags));
}

/// Removes finished task lines and logs them under today's date
fn relocate(project: &mut Project, finished: Vec<Finished>, options: &AnnotateOptions, today: NaiveDate) {
    if finished.is_empty() {
        return;
    }

    let indices: Vec<usize> = finished.iter().map(|f| f.index).collect();
    project.body.remove(&indices);

    let mut entry = new_entry(options, project, today, None);
    entry.body = finished
        .into_iter()
        .map(|f| {
            let label = match f.status {
                TaskStatus::Deleted => "deleted",
                _ => "completed",
            };
            format!("  - [{}] {}", label, f.description)
        })
        .collect();

    let end = project.log.items.len();
    insert_dated(project, end, LogItem::Entry(entry), today);
}
