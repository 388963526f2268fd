use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;

use super::Workspace;
use crate::errors::ToolError;

/// Result of a shell command run for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    /// `None` when the command was killed (timeout or signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl Workspace {
    /// Run `command` with `sh -c`, killing it after `timeout`.
    ///
    /// A non-zero exit or a timeout is reported in the outcome, not as an error.
    pub async fn run_command(
        &self,
        command: &str,
        cwd: Option<&str>,
        timeout: Duration,
    ) -> Result<CommandOutcome, ToolError> {
        let dir = match cwd {
            Some(cwd) => self.resolve(cwd)?,
            None => self.root.clone(),
        };
        if !dir.is_dir() {
            return Err(ToolError::NotADirectory(dir));
        }

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::io(&dir, e))?;
        tracing::debug!(command, cwd = %dir.display(), "Running tool command");

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output.map_err(|e| ToolError::io(&dir, e))?;
                Ok(CommandOutcome {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                })
            }
            Err(_) => {
                tracing::warn!(command, secs = timeout.as_secs(), "Tool command timed out");
                Ok(CommandOutcome {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("command timed out after {}s", timeout.as_secs()),
                    timed_out: true,
                })
            }
        }
    }
}
