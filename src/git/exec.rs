//! git::exec
//!
//! Synchronous subprocess execution of the `git` binary.
//!
//! Every repository interaction is a blocking `git` subcommand run through
//! the [`Executor`] trait. The trait makes only two promises: a successful
//! spawn yields the child's stdout/stderr and exit status, and abnormal
//! terminations (spawn failure, death by signal) surface as typed errors.
//! Interpreting a non-zero exit status is the caller's job, because some
//! non-zero exits are expected outcomes (`merge-base --is-ancestor`, a
//! rebase stopping on conflict) rather than failures.

use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

/// Errors from subprocess execution.
///
/// A command that ran to completion with a non-zero status is *not* an
/// `ExecError`; see [`CommandOutput::status`]. Callers that treat non-zero
/// as fatal use [`CommandOutput::expect_success`], which produces
/// [`ExecError::CommandFailed`] carrying the full captured output.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be spawned at all. Fatal, never retried.
    #[error("failed to spawn `git {args}`: {source}", args = args.join(" "))]
    SpawnFailed {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    /// The process was terminated by a signal. Fatal, never retried.
    #[error("`git {args}` was killed by a signal\n{stderr}", args = args.join(" "))]
    Killed { args: Vec<String>, stderr: String },

    /// The command exited non-zero and the caller required success.
    #[error(
        "command failed with exit code {status}:\ngit {args}\n{stdout}\n{stderr}",
        args = args.join(" ")
    )]
    CommandFailed {
        args: Vec<String>,
        status: i32,
        stdout: String,
        stderr: String,
    },
}

/// Captured result of a completed subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The argument vector that produced this output (for error reporting).
    pub args: Vec<String>,
    /// Exit status of the process.
    pub status: i32,
    /// Stdout with trailing whitespace trimmed.
    pub stdout: String,
    /// Stderr with trailing whitespace trimmed.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Convert a non-zero exit into [`ExecError::CommandFailed`].
    pub fn expect_success(self) -> Result<Self, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecError::CommandFailed {
                args: self.args,
                status: self.status,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }

    /// Stdout split into non-empty lines.
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }
}

/// A request to run one `git` subcommand.
#[derive(Debug, Default, Clone)]
pub struct CommandRequest {
    pub args: Vec<String>,
    /// Text piped to the child's stdin (e.g. `hash-object -w --stdin`).
    pub stdin: Option<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
}

impl CommandRequest {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            args: args
                .into_iter()
                .map(|a| a.as_ref().to_string_lossy().into_owned())
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Runs `git` subcommands synchronously.
pub trait Executor {
    fn run(&self, request: CommandRequest) -> Result<CommandOutput, ExecError>;
}

/// Production executor: spawns the `git` binary in a working directory.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    cwd: PathBuf,
}

impl GitExecutor {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

impl Executor for GitExecutor {
    fn run(&self, request: CommandRequest) -> Result<CommandOutput, ExecError> {
        let mut command = Command::new("git");
        command
            .args(&request.args)
            .current_dir(&self.cwd)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &request.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ExecError::SpawnFailed {
            args: request.args.clone(),
            source,
        })?;

        if let Some(input) = &request.stdin {
            // The child holds the other end; ignore EPIPE from early exits.
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(input.as_bytes());
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| ExecError::SpawnFailed {
                args: request.args.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string();
        let stderr = String::from_utf8_lossy(&output.stderr)
            .trim_end()
            .to_string();

        match output.status.code() {
            Some(status) => Ok(CommandOutput {
                args: request.args,
                status,
                stdout,
                stderr,
            }),
            // On unix, no exit code means the child died to a signal.
            None => Err(ExecError::Killed {
                args: request.args,
                stderr,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_success_passes_through_zero_exit() {
        let output = CommandOutput {
            args: vec!["status".into()],
            status: 0,
            stdout: "ok".into(),
            stderr: String::new(),
        };
        assert!(output.expect_success().is_ok());
    }

    #[test]
    fn expect_success_captures_failure_details() {
        let output = CommandOutput {
            args: vec!["rebase".into()],
            status: 128,
            stdout: "out".into(),
            stderr: "fatal: bad revision".into(),
        };
        let err = output.expect_success().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit code 128"));
        assert!(message.contains("git rebase"));
        assert!(message.contains("fatal: bad revision"));
    }

    #[test]
    fn lines_filters_empty() {
        let output = CommandOutput {
            args: vec![],
            status: 0,
            stdout: "a\n\nb".into(),
            stderr: String::new(),
        };
        assert_eq!(output.lines(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn request_builder_collects_args_env_stdin() {
        let request = CommandRequest::new(["hash-object", "-w", "--stdin"])
            .with_stdin("{}")
            .with_env("GIT_EDITOR", "true");
        assert_eq!(request.args, vec!["hash-object", "-w", "--stdin"]);
        assert_eq!(request.stdin.as_deref(), Some("{}"));
        assert_eq!(request.env.len(), 1);
    }
}
