//! Commit history collaborator

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

use super::process::{Invocation, ProcessError};

#[derive(Debug, Error)]
pub enum CommitLogError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{} is not a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("no commit author configured")]
    NoAuthor,

    #[error("cannot read git log line {0:?}")]
    Parse(String),
}

/// One commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub short_id: String,
    pub summary: String,
    pub authored: NaiveDateTime,
}

/// Source of commits, queried afresh for every entry
pub trait CommitLog {
    /// Commits by `author` authored within `[since, until]`, oldest first
    fn commits_by(
        &self,
        author: &str,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Box<dyn Iterator<Item = Commit>>, CommitLogError>;
}

/// Reads commits from a git repository with `git log`
#[derive(Debug, Clone)]
pub struct GitCommitLog {
    repo: PathBuf,
    timeout: Duration,
}

impl GitCommitLog {
    pub fn new(repo: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            repo: repo.into(),
            timeout,
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// The repository's configured `user.email`
    pub fn default_author(&self) -> Result<String, CommitLogError> {
        let out = self.git().args(["config", "user.email"]).run(self.timeout)?;
        let author = out.trim();
        if author.is_empty() {
            return Err(CommitLogError::NoAuthor);
        }
        Ok(author.to_string())
    }

    fn git(&self) -> Invocation {
        Invocation::new("git").current_dir(&self.repo)
    }
}

impl CommitLog for GitCommitLog {
    fn commits_by(
        &self,
        author: &str,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Box<dyn Iterator<Item = Commit>>, CommitLogError> {
        if !self.repo.join(".git").exists() {
            return Err(CommitLogError::NotARepository(self.repo.clone()));
        }

        let out = self
            .git()
            .args([
                "log".to_string(),
                "--reverse".to_string(),
                "--no-merges".to_string(),
                format!("--author={}", author),
                format!("--since={}", since.format("%Y-%m-%d %H:%M:%S")),
                format!("--until={}", until.format("%Y-%m-%d %H:%M:%S")),
                "--format=%h%x09%aI%x09%s".to_string(),
            ])
            .run(self.timeout)?;

        let commits = parse_log(&out)?
            .into_iter()
            .filter(move |c| c.authored >= since && c.authored <= until);
        Ok(Box::new(commits))
    }
}

fn parse_log(out: &str) -> Result<Vec<Commit>, CommitLogError> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, '\t');
            let (Some(sha), Some(date), summary) = (fields.next(), fields.next(), fields.next()) else {
                return Err(CommitLogError::Parse(line.to_string()));
            };
            let authored = DateTime::parse_from_rfc3339(date)
                .map_err(|_| CommitLogError::Parse(line.to_string()))?
                .naive_local();
            Ok(Commit {
                short_id: sha.to_string(),
                summary: summary.unwrap_or_default().to_string(),
                authored,
            })
        })
        .collect()
}

/// In-memory commit log
#[derive(Debug, Default, Clone)]
pub struct MemoryCommitLog {
    commits: Vec<(String, Commit)>,
    failing: bool,
}

impl MemoryCommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a commit; commits must be added oldest first
    pub fn with_commit(mut self, author: &str, short_id: &str, summary: &str, authored: NaiveDateTime) -> Self {
        self.commits.push((
            author.to_string(),
            Commit {
                short_id: short_id.to_string(),
                summary: summary.to_string(),
                authored,
            },
        ));
        self
    }

    pub fn failing() -> Self {
        Self {
            commits: Vec::new(),
            failing: true,
        }
    }
}

impl CommitLog for MemoryCommitLog {
    fn commits_by(
        &self,
        author: &str,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Box<dyn Iterator<Item = Commit>>, CommitLogError> {
        if self.failing {
            return Err(CommitLogError::NotARepository(PathBuf::from("memory")));
        }
        let commits: Vec<Commit> = self
            .commits
            .iter()
            .filter(|(a, c)| a == author && c.authored >= since && c.authored <= until)
            .map(|(_, c)| c.clone())
            .collect();
        Ok(Box::new(commits.into_iter()))
    }
}
