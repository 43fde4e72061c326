//! External command execution.
//!
//! [`CommandExecutor`] is the only seam through which sitekeep touches the
//! host: every process launch and every write outside the project tree goes
//! through it. [`Runner`] layers privilege escalation, progress output and
//! exit-status policy on top.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: io::Error,
    },

    #[error("Command exited with status {status}: {command}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to write {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },
}

impl ExecError {
    /// Exit status of the failed command, if it ran at all.
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Failed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs a fully-formed argv to completion.
pub trait CommandExecutor {
    /// Spawn `argv`, feed `stdin` if given, and wait for exit.
    /// A nonzero exit is not an error at this level.
    fn spawn(&self, argv: &[String], stdin: Option<&str>) -> io::Result<CommandOutput>;
}

/// Executes commands as real child processes.
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn spawn(&self, argv: &[String], stdin: Option<&str>) -> io::Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a separate thread so a child that echoes its input
        // (tee) cannot fill the stdout pipe while we are still writing.
        let writer = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.to_owned();
                Some(std::thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child.wait_with_output()?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e),
                Err(_) => return Err(io::Error::other("stdin writer thread panicked")),
                _ => {}
            }
        }
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A command to run, plus how to run it.
#[derive(Debug, Clone)]
pub struct Cmd {
    argv: Vec<String>,
    description: Option<String>,
    elevate: bool,
    must_succeed: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            description: None,
            elevate: false,
            must_succeed: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Human-readable progress line shown before the command runs.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run through the configured privilege-escalation prefix.
    pub fn elevated(mut self) -> Self {
        self.elevate = true;
        self
    }

    /// Return the output regardless of exit status.
    pub fn allow_failure(mut self) -> Self {
        self.must_succeed = false;
        self
    }
}

/// Applies escalation, progress output and exit-status policy to commands.
#[derive(Clone, Copy)]
pub struct Runner<'a> {
    executor: &'a dyn CommandExecutor,
    escalation: &'a [String],
    progress: bool,
}

impl<'a> Runner<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, escalation: &'a [String]) -> Self {
        Self {
            executor,
            escalation,
            progress: false,
        }
    }

    /// Print `[+] description` to stdout before each described command.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    fn full_argv(&self, argv: &[String], elevate: bool) -> Vec<String> {
        let mut full = Vec::with_capacity(argv.len() + self.escalation.len());
        if elevate {
            full.extend(self.escalation.iter().cloned());
        }
        full.extend(argv.iter().cloned());
        full
    }

    pub fn run(&self, cmd: &Cmd) -> Result<CommandOutput, ExecError> {
        let argv = self.full_argv(&cmd.argv, cmd.elevate);
        let command = argv.join(" ");

        if let Some(description) = &cmd.description {
            if self.progress {
                println!("[+] {}", description);
            }
            info!(command = %command, "{}", description);
        } else {
            debug!(command = %command, "Running command");
        }

        let output = self
            .executor
            .spawn(&argv, None)
            .map_err(|source| ExecError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.success() {
            warn!(
                command = %command,
                status = output.status,
                stderr = %output.stderr.trim(),
                "Command exited with nonzero status"
            );
            if cmd.must_succeed {
                return Err(ExecError::Failed {
                    command,
                    status: output.status,
                    stderr: output.stderr,
                });
            }
        }

        Ok(output)
    }

    /// Write `content` to `path` through an elevated `tee`.
    ///
    /// This is the only way sitekeep writes files outside its project tree.
    pub fn write_privileged(&self, path: &Path, content: &str) -> Result<(), ExecError> {
        let argv = self.full_argv(
            &["tee".to_string(), path.to_string_lossy().into_owned()],
            true,
        );
        debug!(path = %path.display(), bytes = content.len(), "Privileged write");

        let output = self
            .executor
            .spawn(&argv, Some(content))
            .map_err(|e| ExecError::WriteFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.success() {
            return Err(ExecError::WriteFailed {
                path: path.to_path_buf(),
                message: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}
