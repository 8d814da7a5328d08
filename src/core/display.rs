//! Virtual display server lifecycle.
//!
//! The server is started detached and left running for the rest of the
//! invocation. A pidfile naming a live process that runs the configured
//! program counts as "already running", so repeated starts are no-ops.

use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::action::DisplaySpec;
use crate::error::{Error, Result};
use crate::utils::io;

/// How long a freshly spawned server must survive before it counts as started.
const STARTUP_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayStatus {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
}

impl DisplayStatus {
    pub fn pid(&self) -> u32 {
        match self {
            DisplayStatus::Started { pid } | DisplayStatus::AlreadyRunning { pid } => *pid,
        }
    }
}

pub fn read_pid(pidfile: &Path) -> Option<u32> {
    fs::read_to_string(pidfile)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|pid| *pid > 0)
}

#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks that the process exists and is signalable.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
pub fn is_alive(_pid: u32) -> bool {
    false
}

/// Whether `pid`'s command line names `program` (as argv[0], or as the
/// script an interpreter runs).
#[cfg(target_os = "linux")]
pub fn runs_program(pid: u32, program: &str) -> bool {
    let Ok(raw) = fs::read(format!("/proc/{}/cmdline", pid)) else {
        return false;
    };
    let wanted = Path::new(program).file_name();
    raw.split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .any(|arg| Path::new(&*String::from_utf8_lossy(arg)).file_name() == wanted)
}

#[cfg(not(target_os = "linux"))]
pub fn runs_program(_pid: u32, _program: &str) -> bool {
    true
}

/// Start the display server unless the pidfile names a live server.
pub fn ensure_running(spec: &DisplaySpec, env: &[(String, String)]) -> Result<DisplayStatus> {
    if let Some(pid) = read_pid(&spec.pidfile) {
        if is_alive(pid) && runs_program(pid, &spec.program) {
            tracing::debug!(pid, display = %spec.display_id, "display server already running");
            return Ok(DisplayStatus::AlreadyRunning { pid });
        }
        tracing::debug!(pid, "stale display pidfile");
    }

    let mut child = Command::new(&spec.program)
        .args(spec.argv())
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            Error::display_start_failed(format!("Failed to start {}: {}", spec.program, e))
                .with_hint("Install Xvfb or set display.enabled: false")
        })?;

    thread::sleep(STARTUP_GRACE);
    match child.try_wait() {
        Ok(Some(status)) => {
            return Err(Error::display_start_failed(format!(
                "{} exited immediately ({})",
                spec.program, status
            ))
            .with_hint(format!("Is display {} already in use?", spec.display_id)));
        }
        Ok(None) => {}
        Err(e) => {
            return Err(Error::display_start_failed(format!(
                "Failed to check {}: {}",
                spec.program, e
            )));
        }
    }

    let pid = child.id();
    if let Some(parent) = spec.pidfile.parent() {
        io::ensure_dir(parent)?;
    }
    io::write_file_atomic(&spec.pidfile, &pid.to_string(), "write display pidfile")?;

    tracing::info!(pid, display = %spec.display_id, screen = %spec.screen, "display server started");
    Ok(DisplayStatus::Started { pid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn spec(program: &str, pidfile: PathBuf) -> DisplaySpec {
        DisplaySpec {
            program: program.to_string(),
            display_id: ":99".to_string(),
            screen: "1400x900x24".to_string(),
            args: Vec::new(),
            pidfile,
        }
    }

    #[test]
    fn read_pid_ignores_garbage() {
        let dir = TempDir::new().unwrap();
        let pidfile = dir.path().join("x.pid");
        fs::write(&pidfile, "not-a-pid").unwrap();
        assert_eq!(read_pid(&pidfile), None);
        fs::write(&pidfile, "1234\n").unwrap();
        assert_eq!(read_pid(&pidfile), Some(1234));
        assert_eq!(read_pid(&dir.path().join("missing.pid")), None);
    }

    #[cfg(unix)]
    #[test]
    fn current_process_is_alive() {
        assert!(is_alive(std::process::id()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn recycled_pid_is_not_the_server() {
        let dir = TempDir::new().unwrap();
        let pidfile = dir.path().join("display.pid");
        // Alive, but it is the test binary rather than Xvfb.
        fs::write(&pidfile, std::process::id().to_string()).unwrap();
        assert!(!runs_program(std::process::id(), "/usr/bin/Xvfb"));

        let err = ensure_running(&spec("/nonexistent/Xvfb", pidfile), &[]).unwrap_err();
        assert_eq!(err.code.as_str(), "display.start_failed");
    }

    #[test]
    fn missing_program_fails_to_start() {
        let dir = TempDir::new().unwrap();
        let err = ensure_running(
            &spec("/nonexistent/Xvfb", dir.path().join("display.pid")),
            &[],
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "display.start_failed");
    }

    #[cfg(unix)]
    #[test]
    fn long_running_program_is_recorded() {
        let dir = TempDir::new().unwrap();
        let pidfile = dir.path().join("display.pid");
        // Stand-in server that ignores its arguments.
        let script = dir.path().join("fake-xvfb");
        fs::write(&script, "#!/bin/sh\nsleep 5\nexit 0\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let status = ensure_running(&spec(&script.to_string_lossy(), pidfile.clone()), &[]).unwrap();
        assert!(matches!(status, DisplayStatus::Started { .. }));
        assert_eq!(read_pid(&pidfile), Some(status.pid()));

        let again = ensure_running(&spec(&script.to_string_lossy(), pidfile), &[]).unwrap();
        assert_eq!(again, DisplayStatus::AlreadyRunning { pid: status.pid() });

        unsafe {
            libc::kill(status.pid() as libc::pid_t, libc::SIGKILL);
        }
    }
}
