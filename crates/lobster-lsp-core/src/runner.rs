//! Subprocess execution for the external compiler.
//!
//! Everything that talks to the `lobster` binary goes through the
//! [`CompilerRunner`] trait so probe and validation logic can be tested with a
//! scripted runner instead of a real process.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::RunError;

/// Output from a command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (0 = success)
    pub code: i32,
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs the compiler executable.
#[async_trait]
pub trait CompilerRunner: Send + Sync {
    /// Run `executable` with `args`, capturing exit code, stdout and stderr.
    ///
    /// Implementations must give up after `timeout` and report
    /// [`RunError::Timeout`] instead of waiting forever.
    async fn run(
        &self,
        executable: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError>;
}

/// Runs the compiler as a real child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CompilerRunner for ProcessRunner {
    async fn run(
        &self,
        executable: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        tracing::debug!(executable, ?args, "spawning compiler");

        let child = Command::new(executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                executable: executable.to_string(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(executable, ?timeout, "compiler timed out");
                return Err(RunError::Timeout {
                    executable: executable.to_string(),
                    timeout,
                });
            }
        };

        let code = output.status.code().ok_or_else(|| RunError::Killed {
            executable: executable.to_string(),
        })?;

        Ok(CommandOutput {
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
