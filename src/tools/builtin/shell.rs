//! Shell execution tool for running commands.
//!
//! Commands run through `sh -c` (`cmd /C` on Windows) with stdin closed.
//! Stdout and stderr are captured into one string. A non-zero exit status is
//! part of the result text, not a tool failure.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::ToolError;
use crate::tools::tool::ToolOutput;

/// Maximum output size before truncation (64KB).
const MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// Default command timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub const RUN_COMMAND_DESCRIPTION: &str = "Execute a terminal command.\n\n\
This tool allows running shell commands like git commands, ls, etc. The command will be executed \
in the current working directory and its output will be returned. Be careful with commands that \
might modify the file system or have other side effects.";

#[derive(Debug, Deserialize)]
pub struct RunCommandInput {
    pub command: String,
}

pub fn run_command_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "command": {
                "type": "string",
                "description": "The terminal command to execute"
            }
        },
        "required": ["command"]
    })
}

/// Shell command runner.
#[derive(Debug, Clone)]
pub struct ShellTool {
    /// Working directory for commands (if None, uses cwd).
    working_dir: Option<PathBuf>,
    /// Command timeout.
    timeout: Duration,
}

impl ShellTool {
    /// Create a new shell tool with default settings.
    pub fn new() -> Self {
        Self {
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Set the command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, input: RunCommandInput) -> Result<ToolOutput, ToolError> {
        let cmd = input.command.trim();
        if cmd.is_empty() {
            return Err(ToolError::invalid("run_command", "command cannot be empty"));
        }

        let start = std::time::Instant::now();
        let (output, status) = self.execute_direct(cmd).await?;
        tracing::debug!(
            command = %truncate_for_log(cmd),
            exit_code = ?status.code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Command finished"
        );

        let mut result = format!("Command: {}\n\nOutput:\n{}", cmd, output);
        if !status.success() {
            match status.code() {
                Some(code) => result.push_str(&format!("\nError: exit status {}\n", code)),
                None => result.push_str("\nError: terminated by signal\n"),
            }
        }
        Ok(ToolOutput::text(result))
    }

    /// Execute a command, capturing stdout and stderr.
    async fn execute_direct(
        &self,
        cmd: &str,
    ) -> Result<(String, std::process::ExitStatus), ToolError> {
        let mut command = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", cmd]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", cmd]);
            c
        };

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| ToolError::io("failed to run command", e))?,
            Err(_) => return Err(ToolError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = if stderr.is_empty() {
            stdout.into_owned()
        } else if stdout.is_empty() {
            stderr.into_owned()
        } else {
            format!("{}\n\n--- stderr ---\n{}", stdout, stderr)
        };

        Ok((truncate_output(&combined), output.status))
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate output to fit within limits (UTF-8 safe).
fn truncate_output(s: &str) -> String {
    if s.len() <= MAX_OUTPUT_SIZE {
        s.to_string()
    } else {
        let half = MAX_OUTPUT_SIZE / 2;
        let head_end = floor_char_boundary(s, half);
        let tail_start = floor_char_boundary(s, s.len() - half);
        format!(
            "{}\n\n... [truncated {} bytes] ...\n\n{}",
            &s[..head_end],
            s.len() - MAX_OUTPUT_SIZE,
            &s[tail_start..]
        )
    }
}

/// Find the largest byte index <= `i` that is a valid char boundary.
fn floor_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    let mut pos = i;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn truncate_for_log(s: &str) -> String {
    if s.chars().count() <= 100 {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(100).collect::<String>())
    }
}
