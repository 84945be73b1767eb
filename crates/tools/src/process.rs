//! Bounded subprocess execution shared by the process-running handlers.

use std::process::Stdio;
use std::time::Duration;

use loopclaw_core::error::ToolError;
use tokio::process::Command;
use tracing::{debug, warn};

/// Longest output handed back to the model.
pub const MAX_OUTPUT_CHARS: usize = 8000;

/// What a finished process left behind.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code plus non-empty streams, truncated for the model.
    pub fn render(&self) -> String {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "killed by signal".into());
        let mut text = format!("exit code: {code}");
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        if !stdout.is_empty() {
            text.push_str("\nstdout:\n");
            text.push_str(stdout);
        }
        if !stderr.is_empty() {
            text.push_str("\nstderr:\n");
            text.push_str(stderr);
        }
        if stdout.is_empty() && stderr.is_empty() {
            text.push_str("\n(no output)");
        }
        truncate_output(&text, MAX_OUTPUT_CHARS)
    }
}

/// Run a command to completion or until `limit` passes.
///
/// On unix the child leads its own process group, and the whole group is
/// killed when the limit passes, so background jobs and pipeline stages go
/// too. stdin is closed so nothing can block waiting for input.
pub async fn run(mut command: Command, limit: Duration, tool_name: &str) -> Result<ProcessOutcome, ToolError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    debug!(tool = tool_name, ?command, "Spawning process");

    let child = command
        .spawn()
        .map_err(|e| ToolError::failed(tool_name, format!("failed to start process: {e}")))?;
    let pid = child.id();

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let outcome = ProcessOutcome {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            if !outcome.success() {
                warn!(tool = tool_name, exit_code = ?outcome.exit_code, "Process exited unsuccessfully");
            }
            Ok(outcome)
        }
        Ok(Err(e)) => Err(ToolError::failed(tool_name, e)),
        Err(_) => {
            warn!(tool = tool_name, ?pid, secs = limit.as_secs(), "Process timed out, killing");
            if let Some(pid) = pid {
                kill_group(pid);
            }
            Err(ToolError::Timeout {
                tool_name: tool_name.to_string(),
                timeout_secs: limit.as_secs(),
            })
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// A `sh -c` command (or `cmd /C` on Windows).
pub fn shell(command_line: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        cmd
    }
}

/// Keep the head and tail of long output around a marker.
pub fn truncate_output(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let half = max / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();
    format!("{head}\n\n[... {} chars truncated ...]\n\n{tail}", total - 2 * half)
}
