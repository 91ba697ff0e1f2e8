//! External collaborators
//!
//! The task tracker and the commit history are reached through traits so
//! the annotate pass can run against in-memory implementations. The real
//! ones shell out with a per-call timeout.

mod commits;
mod process;
mod tracker;

pub use commits::{Commit, CommitLog, CommitLogError, GitCommitLog, MemoryCommitLog};
pub use process::{Invocation, ProcessError};
pub use tracker::{
    MemoryTracker, NewTask, TaskInfo, TaskStatus, TaskwarriorTracker, Tracker, TrackerError,
};
