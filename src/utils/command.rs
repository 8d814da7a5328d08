//! Command construction and output capture primitives.

use serde::Serialize;
use std::process::Command;

/// Captured output is capped to this many bytes, keeping the tail.
pub const MAX_CAPTURED_OUTPUT: usize = 10 * 1024;

/// Build a platform shell invocation for a command string.
pub fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    let cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    cmd
}

/// Keep the last `max` bytes of `text`, cut on a char boundary.
pub fn tail(text: &str, max: usize) -> String {
    let trimmed = text.trim_end();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }

    let mut start = trimmed.len() - max;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

/// Captured output from command execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: String, stderr: String) -> Self {
        Self {
            stdout: tail(&stdout, MAX_CAPTURED_OUTPUT),
            stderr: tail(&stderr, MAX_CAPTURED_OUTPUT),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}
