//! Task tracker collaborator
//!
//! The tracker is a black box with three calls: create a task, read a
//! task's status by uuid, and resolve a numeric id to a uuid. The default
//! implementation drives the Taskwarrior command line.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::process::{Invocation, ProcessError};

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").expect("uuid regex")
});

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("cannot read tracker output: {0}")]
    Parse(String),

    #[error("tracker did not report the new task: {0}")]
    NotCreated(String),
}

/// Status of a task in the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Open,
    Done,
    Deleted,
}

/// A task as the tracker currently sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub uuid: String,
    /// Current numeric id; `None` once the task is no longer pending
    pub id: Option<u32>,
    pub status: TaskStatus,
    pub description: String,
    pub tags: Vec<String>,
}

/// A task to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub description: String,
    pub project: String,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

/// Operations the annotate pass needs from a task tracker
pub trait Tracker {
    /// Creates a task, returning its numeric id and uuid
    fn create(&mut self, task: &NewTask) -> Result<(u32, String), TrackerError>;

    /// Reads a task by uuid; `None` if the tracker does not know it
    fn get_status(&mut self, uuid: &str) -> Result<Option<TaskInfo>, TrackerError>;

    /// Resolves a numeric id to a uuid; `None` if no task has that id
    fn resolve(&mut self, id: u32) -> Result<Option<String>, TrackerError>;
}

/// Task record from `task export`
#[derive(Debug, Deserialize)]
struct Exported {
    #[serde(default)]
    id: u32,
    uuid: String,
    status: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<Exported> for TaskInfo {
    fn from(task: Exported) -> Self {
        let status = match task.status.as_str() {
            "completed" => TaskStatus::Done,
            "deleted" => TaskStatus::Deleted,
            _ => TaskStatus::Open,
        };
        TaskInfo {
            uuid: task.uuid,
            id: Some(task.id).filter(|id| *id != 0),
            status,
            description: task.description,
            tags: task.tags,
        }
    }
}

/// Taskwarrior through its command line
#[derive(Debug, Clone)]
pub struct TaskwarriorTracker {
    command: String,
    timeout: Duration,
}

impl TaskwarriorTracker {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    fn task(&self) -> Invocation {
        Invocation::new(&self.command).args(["rc.confirmation=no", "rc.hooks=off", "rc.json.array=on"])
    }

    fn export(&self, filter: &str) -> Result<Vec<TaskInfo>, TrackerError> {
        let out = self.task().args([filter, "export"]).run(self.timeout)?;
        parse_export(&out)
    }
}

impl Tracker for TaskwarriorTracker {
    fn create(&mut self, task: &NewTask) -> Result<(u32, String), TrackerError> {
        let mut args = vec!["rc.verbose=new-uuid".to_string(), "add".to_string()];
        if !task.project.is_empty() {
            args.push(format!("project:{}", task.project));
        }
        args.extend(task.tags.iter().map(|t| format!("+{}", t)));
        args.extend(task.attributes.iter().map(|(k, v)| format!("{}:{}", k, v)));
        args.push("--".to_string());
        args.push(task.description.clone());

        let out = self.task().args(args).run(self.timeout)?;
        let uuid = UUID_RE
            .find(&out)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| TrackerError::NotCreated(out.trim().to_string()))?;
        debug!(%uuid, "created task");

        let created = self
            .get_status(&uuid)?
            .ok_or_else(|| TrackerError::NotCreated(uuid.clone()))?;
        let id = created
            .id
            .ok_or_else(|| TrackerError::NotCreated(format!("{} has no id", uuid)))?;
        Ok((id, uuid))
    }

    fn get_status(&mut self, uuid: &str) -> Result<Option<TaskInfo>, TrackerError> {
        Ok(self.export(uuid)?.into_iter().find(|t| t.uuid == uuid))
    }

    fn resolve(&mut self, id: u32) -> Result<Option<String>, TrackerError> {
        Ok(self
            .export(&id.to_string())?
            .into_iter()
            .find(|t| t.id == Some(id))
            .map(|t| t.uuid))
    }
}

fn parse_export(out: &str) -> Result<Vec<TaskInfo>, TrackerError> {
    if out.trim().is_empty() {
        return Ok(Vec::new());
    }
    let tasks: Vec<Exported> =
        serde_json::from_str(out).map_err(|e| TrackerError::Parse(e.to_string()))?;
    Ok(tasks.into_iter().map(TaskInfo::from).collect())
}

/// In-memory tracker
///
/// Ids are handed out like Taskwarrior does: pending tasks are numbered
/// from 1 and finished tasks lose their id.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    tasks: Vec<TaskInfo>,
    created: Vec<NewTask>,
    failing: bool,
    next_uuid: u32,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an open task with a given id and uuid
    pub fn with_task(mut self, id: u32, uuid: &str, description: &str) -> Self {
        self.tasks.push(TaskInfo {
            uuid: uuid.to_string(),
            id: Some(id),
            status: TaskStatus::Open,
            description: description.to_string(),
            tags: Vec::new(),
        });
        self
    }

    /// Makes every call fail, as an unreachable tracker would
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn set_status(&mut self, uuid: &str, status: TaskStatus) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.uuid == uuid) {
            task.status = status;
            if status != TaskStatus::Open {
                task.id = None;
            }
        }
    }

    pub fn renumber(&mut self, uuid: &str, id: u32) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.uuid == uuid) {
            task.id = Some(id);
        }
    }

    pub fn set_description(&mut self, uuid: &str, description: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.uuid == uuid) {
            task.description = description.to_string();
        }
    }

    /// Tasks created so far
    pub fn created(&self) -> &[NewTask] {
        &self.created
    }

    pub fn task(&self, uuid: &str) -> Option<&TaskInfo> {
        self.tasks.iter().find(|t| t.uuid == uuid)
    }

    fn check(&self) -> Result<(), TrackerError> {
        if self.failing {
            return Err(TrackerError::Process(ProcessError::Timeout {
                program: "memory".to_string(),
                timeout: Duration::ZERO,
            }));
        }
        Ok(())
    }
}

impl Tracker for MemoryTracker {
    fn create(&mut self, task: &NewTask) -> Result<(u32, String), TrackerError> {
        self.check()?;
        self.next_uuid += 1;
        let uuid = format!("uuid-{}", self.next_uuid);
        let id = self.tasks.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1;

        self.tasks.push(TaskInfo {
            uuid: uuid.clone(),
            id: Some(id),
            status: TaskStatus::Open,
            description: task.description.clone(),
            tags: task.tags.clone(),
        });
        self.created.push(task.clone());
        Ok((id, uuid))
    }

    fn get_status(&mut self, uuid: &str) -> Result<Option<TaskInfo>, TrackerError> {
        self.check()?;
        Ok(self.task(uuid).cloned())
    }

    fn resolve(&mut self, id: u32) -> Result<Option<String>, TrackerError> {
        self.check()?;
        Ok(self
            .tasks
            .iter()
            .find(|t| t.id == Some(id))
            .map(|t| t.uuid.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export() {
        let out = r#"[
            {"id": 3, "uuid": "6fa4c7a5-0000-4000-8000-000000000001", "status": "pending",
             "description": "write report", "tags": ["work"], "urgency": 1.2},
            {"id": 0, "uuid": "6fa4c7a5-0000-4000-8000-000000000002", "status": "completed",
             "description": "done thing"}
        ]"#;

        let tasks = parse_export(out).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, Some(3));
        assert_eq!(tasks[0].status, TaskStatus::Open);
        assert_eq!(tasks[0].tags, vec!["work"]);
        assert_eq!(tasks[1].id, None);
        assert_eq!(tasks[1].status, TaskStatus::Done);
    }

    #[test]
    fn empty_export() {
        assert!(parse_export("").unwrap().is_empty());
        assert!(parse_export("[]").unwrap().is_empty());
        assert!(matches!(parse_export("nope"), Err(TrackerError::Parse(_))));
    }

    #[test]
    fn memory_tracker_numbering() {
        let mut tracker = MemoryTracker::new().with_task(1, "U1", "first");
        let (id, uuid) = tracker
            .create(&NewTask {
                description: "second".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(id, 2);
        assert_eq!(tracker.resolve(2).unwrap(), Some(uuid.clone()));

        tracker.set_status("U1", TaskStatus::Done);
        assert_eq!(tracker.resolve(1).unwrap(), None);
        assert_eq!(tracker.get_status("U1").unwrap().unwrap().status, TaskStatus::Done);

        tracker.set_failing(true);
        assert!(tracker.get_status(&uuid).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn taskwarrior_through_a_fake_binary() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("task");
        fs::write(
            &script,
            "#!/bin/sh\n\
             case \"$*\" in\n\
             *add*) echo 'Created task 6fa4c7a5-0000-4000-8000-00000000000a.' ;;\n\
             *export*) echo '[{\"id\": 7, \"uuid\": \"6fa4c7a5-0000-4000-8000-00000000000a\", \"status\": \"pending\", \"description\": \"x\"}]' ;;\n\
             esac\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut tracker = TaskwarriorTracker::new(script.to_string_lossy(), Duration::from_secs(5));
        let (id, uuid) = tracker
            .create(&NewTask {
                description: "x".into(),
                project: "site".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(id, 7);
        assert_eq!(uuid, "6fa4c7a5-0000-4000-8000-00000000000a");
        assert_eq!(tracker.resolve(7).unwrap(), Some(uuid));
    }
}
