//! Running collaborator programs with a timeout

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} timed out after {}s", timeout.as_secs_f32())]
    Timeout { program: String, timeout: Duration },

    #[error("failed waiting for {program}: {source}")]
    Wait { program: String, source: io::Error },

    #[error("{program} exited with {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },
}

/// A program invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Runs the program and returns its stdout
    ///
    /// The child is killed once `timeout` expires; a zero timeout waits
    /// forever. A non-zero exit status is an error.
    pub fn run(&self, timeout: Duration) -> Result<String, ProcessError> {
        debug!(program = %self.program, args = ?self.args, "running");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let writer = match (self.stdin.clone(), child.stdin.take()) {
            (Some(input), Some(mut pipe)) => Some(thread::spawn(move || pipe.write_all(input.as_bytes()))),
            _ => None,
        };

        // Drain pipes while waiting so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take().map(|pipe| thread::spawn(move || read_pipe(pipe)));
        let stderr = child.stderr.take().map(|pipe| thread::spawn(move || read_pipe(pipe)));

        let waited = if timeout > Duration::ZERO {
            child.wait_timeout(timeout)
        } else {
            child.wait().map(Some)
        };

        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                join_writer(&self.program, writer);
                return Err(ProcessError::Timeout {
                    program: self.program.clone(),
                    timeout,
                });
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                join_writer(&self.program, writer);
                return Err(ProcessError::Wait {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        join_writer(&self.program, writer);
        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();

        if !status.success() {
            return Err(ProcessError::Failed {
                program: self.program.clone(),
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Waits for the stdin writer; a child may exit without reading it all
fn join_writer(program: &str, writer: Option<thread::JoinHandle<io::Result<()>>>) {
    match writer.map(thread::JoinHandle::join) {
        Some(Ok(Err(e))) => debug!(%program, "stdin not fully written: {}", e),
        Some(Err(_)) => debug!(%program, "stdin writer panicked"),
        _ => {}
    }
}

fn read_pipe(mut pipe: impl Read) -> String {
    let mut bytes = Vec::new();
    let _ = pipe.read_to_end(&mut bytes);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let out = Invocation::new("sh")
            .args(["-c", "echo hello"])
            .run(Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn passes_stdin() {
        let out = Invocation::new("cat")
            .stdin("line\n")
            .run(Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, "line\n");
    }

    #[test]
    fn child_ignoring_stdin_still_succeeds() {
        let out = Invocation::new("sh")
            .args(["-c", "echo done"])
            .stdin("x".repeat(1 << 20))
            .run(Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, "done\n");
    }

    #[test]
    fn failure_carries_stderr() {
        let err = Invocation::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .run(Duration::from_secs(5))
            .unwrap_err();
        match err {
            ProcessError::Failed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn slow_program_times_out() {
        let err = Invocation::new("sleep")
            .arg("5")
            .run(Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[test]
    fn missing_program() {
        let err = Invocation::new("definitely-not-a-program-xyz")
            .run(Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
