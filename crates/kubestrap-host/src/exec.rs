use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{HostError, Result};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`HostError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process did not exit with status 0.
    pub fn ensure_success(self, program: &str, args: &[&str]) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HostError::CommandFailed {
                command: render_command(program, args),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external programs on the host.
///
/// Every tool invocation made by a step goes through this trait so tests can
/// script the host.
pub trait CommandExecutor {
    /// Run `program` to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; see [`CommandOutput::ensure_success`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be spawned.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Whether `program` can be found on `PATH`.
    fn command_exists(&self, program: &str) -> bool;

    /// Run and require a zero exit status.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run_checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.run(program, args)?.ensure_success(program, args)
    }
}

/// Executes commands on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(command = %render_command(program, args), "running");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| HostError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program, code = ?result.code, "finished");
        Ok(result)
    }

    fn command_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// `program arg1 arg2`, for logs and error messages.
#[must_use]
pub fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}
