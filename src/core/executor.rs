//! Action execution.
//!
//! [`ActionExecutor`] is the seam between plans and the system. The
//! [`LocalExecutor`] runs commands through the platform shell with the
//! pipeline environment, enforcing per-command wall-clock timeouts.

use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::action::{Action, CommandSpec};
use crate::config::TimeoutPolicy;
use crate::display::{self, DisplayStatus};
use crate::error::{CommandFailedDetails, Error, Result};
use crate::files;
use crate::http;
use crate::utils::command::{self, CapturedOutput};

/// Outcome of one executed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub label: String,
    pub kind: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "CapturedOutput::is_empty")]
    pub output: CapturedOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ActionResult {
    pub fn completed(action: &Action, duration: Duration) -> Self {
        Self {
            label: action.label().to_string(),
            kind: action.kind().to_string(),
            success: true,
            exit_code: None,
            duration_ms: duration.as_millis() as u64,
            output: CapturedOutput::default(),
            detail: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_detail<T: Serialize>(mut self, detail: &T) -> Self {
        self.detail = serde_json::to_value(detail).ok();
        self
    }
}

pub trait ActionExecutor {
    /// Execute one action. An `Err` aborts the phase.
    fn execute(&self, action: &Action, env: &[(String, String)]) -> Result<ActionResult>;
}

/// Runs actions on the local machine.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    /// Echo child output lines to stderr while capturing them.
    pub echo: bool,
}

impl LocalExecutor {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }
}

impl ActionExecutor for LocalExecutor {
    fn execute(&self, action: &Action, env: &[(String, String)]) -> Result<ActionResult> {
        let started = Instant::now();

        match action {
            Action::Command(spec) => run_command(spec, env, self.echo),
            Action::Download {
                url, destination, ..
            } => {
                let bytes = http::download_to(url, destination)?;
                Ok(ActionResult::completed(action, started.elapsed())
                    .with_detail(&serde_json::json!({ "bytes": bytes })))
            }
            Action::MakeExecutable { path, .. } => {
                make_executable(path)?;
                Ok(ActionResult::completed(action, started.elapsed()))
            }
            Action::CreateDir { path, .. } => {
                crate::utils::io::ensure_dir(path)?;
                Ok(ActionResult::completed(action, started.elapsed()))
            }
            Action::CopyTree {
                source,
                destination,
                ..
            } => {
                let summary = files::copy_contents(source, destination)?;
                Ok(ActionResult::completed(action, started.elapsed()).with_detail(&summary))
            }
            Action::StartDisplay { spec, .. } => {
                let status: DisplayStatus = display::ensure_running(spec, env)?;
                Ok(ActionResult::completed(action, started.elapsed()).with_detail(&status))
            }
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("stat {}", path.display())))
    })?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("chmod {}", path.display())))
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Run a shell command, draining output on reader threads, with an optional deadline.
pub fn run_command(spec: &CommandSpec, env: &[(String, String)], echo: bool) -> Result<ActionResult> {
    let started = Instant::now();
    let mut cmd = command::shell_command(&spec.command);
    cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    // Timed commands get their own process group so the kill reaches grandchildren.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if spec.timeout_secs.is_some() {
            cmd.process_group(0);
        }
    }

    tracing::debug!(label = %spec.label, command = %spec.command, cwd = ?spec.cwd, "spawn");
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::command_spawn_failed(&spec.command, e))?;

    let stdout_reader = spawn_reader(child.stdout.take(), echo);
    let stderr_reader = spawn_reader(child.stderr.take(), echo);

    let waited = match spec.timeout_secs {
        None => child
            .wait()
            .map(Some)
            .map_err(|e| wait_error(e, &spec.label)),
        Some(secs) => wait_with_deadline(child, Duration::from_secs(secs), &spec.label),
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();
    let duration = started.elapsed();

    let status = waited?;

    let Some(status) = status else {
        return timed_out(spec, stdout, stderr, duration);
    };

    let exit_code = exit_code_of(&status);
    if !status.success() {
        tracing::warn!(label = %spec.label, exit_code, "command failed");
        let output = CapturedOutput::new(stdout, stderr);
        let details = CommandFailedDetails {
            label: spec.label.clone(),
            command: spec.command.clone(),
            cwd: spec.cwd.as_ref().map(|p| p.display().to_string()),
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        if spec.command.starts_with("git ") {
            return Err(Error::git_command_failed(details));
        }
        return Err(Error::command_failed(details));
    }

    Ok(ActionResult {
        label: spec.label.clone(),
        kind: "command".to_string(),
        success: true,
        exit_code: Some(exit_code),
        duration_ms: duration.as_millis() as u64,
        output: CapturedOutput::new(stdout, stderr),
        detail: None,
        warnings: Vec::new(),
    })
}

fn timed_out(
    spec: &CommandSpec,
    stdout: String,
    stderr: String,
    duration: Duration,
) -> Result<ActionResult> {
    let secs = spec.timeout_secs.unwrap_or_default();
    tracing::warn!(label = %spec.label, timeout_secs = secs, "command timed out");

    match spec.on_timeout {
        TimeoutPolicy::Fail => Err(Error::command_timeout(&spec.label, &spec.command, secs)
            .with_hint(format!("Raise the timeout above {}s or set on_timeout: warn", secs))),
        TimeoutPolicy::Warn => Ok(ActionResult {
            label: spec.label.clone(),
            kind: "command".to_string(),
            success: false,
            exit_code: None,
            duration_ms: duration.as_millis() as u64,
            output: CapturedOutput::new(stdout, stderr),
            detail: None,
            warnings: vec![format!("'{}' timed out after {}s and was killed", spec.label, secs)],
        }),
    }
}

/// Wait for `child` up to `timeout`. `Ok(None)` means it was killed at the deadline.
fn wait_with_deadline(mut child: Child, timeout: Duration, label: &str) -> Result<Option<ExitStatus>> {
    let pid = child.id();
    let (tx, rx) = mpsc::channel();
    let waiter = thread::spawn(move || {
        let _ = tx.send(child.wait());
    });

    let received = rx.recv_timeout(timeout);
    if received.is_err() {
        kill_process(pid);
    }
    let _ = waiter.join();
    settle_wait(received, label)
}

fn settle_wait(
    received: std::result::Result<std::io::Result<ExitStatus>, RecvTimeoutError>,
    label: &str,
) -> Result<Option<ExitStatus>> {
    match received {
        Ok(waited) => waited.map(Some).map_err(|e| wait_error(e, label)),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => Err(Error::internal_unexpected(format!(
            "waiter for '{}' exited without a status",
            label
        ))),
    }
}

fn wait_error(e: std::io::Error, label: &str) -> Error {
    Error::internal_io(e.to_string(), Some(format!("wait for '{}'", label)))
}

#[cfg(unix)]
fn kill_process(pid: u32) {
    if let Ok(pid) = libc::pid_t::try_from(pid) {
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process(pid: u32) {
    let _ = std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output();
}

/// Drain `source` to EOF. Invalid UTF-8 is replaced, not treated as the end.
fn spawn_reader<R: Read + Send + 'static>(source: Option<R>, echo: bool) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let Some(source) = source else {
            return buf;
        };
        let mut reader = BufReader::new(source);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "output reader stopped");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if echo {
                eprintln!("{}", line);
            }
            buf.push_str(line);
            buf.push('\n');
            if buf.len() > 4 * command::MAX_CAPTURED_OUTPUT {
                buf = command::tail(&buf, command::MAX_CAPTURED_OUTPUT);
                buf.push('\n');
            }
        }
        buf
    })
}

fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
