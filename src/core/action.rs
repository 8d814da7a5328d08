//! Units of work a phase compiles to.
//!
//! Phases never touch the system directly: they produce an ordered list of
//! [`Action`]s for a given context, and an [`ActionExecutor`](crate::executor::ActionExecutor)
//! carries them out. That keeps plans inspectable (`devdocs plan`) and lets
//! tests substitute a recording executor.

use serde::Serialize;
use std::path::PathBuf;

use crate::config::TimeoutPolicy;
use crate::utils::shell;

/// A shell command run through `sh -c` with the pipeline environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub label: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub on_timeout: TimeoutPolicy,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            cwd: None,
            timeout_secs: None,
            on_timeout: TimeoutPolicy::Fail,
        }
    }

    /// Command built from a program and arguments, quoted for the shell.
    pub fn program<S: AsRef<str>>(label: impl Into<String>, program: &str, args: &[S]) -> Self {
        Self::new(label, shell::command_line(program, args))
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64, policy: TimeoutPolicy) -> Self {
        self.timeout_secs = Some(secs);
        self.on_timeout = policy;
        self
    }
}

/// Arguments for launching the virtual display server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySpec {
    pub program: String,
    pub display_id: String,
    pub screen: String,
    pub args: Vec<String>,
    pub pidfile: PathBuf,
}

impl DisplaySpec {
    /// Full argument vector: `<id> -screen 0 <geometry> <extra args...>`.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![
            self.display_id.clone(),
            "-screen".to_string(),
            "0".to_string(),
            self.screen.clone(),
        ];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Command(CommandSpec),
    Download {
        label: String,
        url: String,
        destination: PathBuf,
    },
    MakeExecutable {
        label: String,
        path: PathBuf,
    },
    CreateDir {
        label: String,
        path: PathBuf,
    },
    /// Copy the top-level, non-hidden entries of `source` into `destination`,
    /// overwriting files and never deleting anything already there.
    CopyTree {
        label: String,
        source: PathBuf,
        destination: PathBuf,
    },
    StartDisplay {
        label: String,
        spec: DisplaySpec,
    },
}

impl Action {
    pub fn command(spec: CommandSpec) -> Self {
        Action::Command(spec)
    }

    pub fn label(&self) -> &str {
        match self {
            Action::Command(spec) => &spec.label,
            Action::Download { label, .. }
            | Action::MakeExecutable { label, .. }
            | Action::CreateDir { label, .. }
            | Action::CopyTree { label, .. }
            | Action::StartDisplay { label, .. } => label,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Command(_) => "command",
            Action::Download { .. } => "download",
            Action::MakeExecutable { .. } => "make_executable",
            Action::CreateDir { .. } => "create_dir",
            Action::CopyTree { .. } => "copy_tree",
            Action::StartDisplay { .. } => "start_display",
        }
    }

    /// The command line for `Command` actions.
    pub fn command_line(&self) -> Option<&str> {
        match self {
            Action::Command(spec) => Some(&spec.command),
            _ => None,
        }
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Action::Command(spec) => spec.timeout_secs,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_quotes_arguments() {
        let spec = CommandSpec::program("commit", "git", &["commit", "-m", "Automated update of dev docs."]);
        assert_eq!(spec.command, "git commit -m 'Automated update of dev docs.'");
        assert!(spec.timeout_secs.is_none());
    }

    #[test]
    fn with_timeout_sets_policy() {
        let spec = CommandSpec::new("html_dev", "make html_dev").with_timeout(1500, TimeoutPolicy::Warn);
        assert_eq!(spec.timeout_secs, Some(1500));
        assert_eq!(spec.on_timeout, TimeoutPolicy::Warn);
    }

    #[test]
    fn display_argv_layout() {
        let spec = DisplaySpec {
            program: "/usr/bin/Xvfb".to_string(),
            display_id: ":99".to_string(),
            screen: "1400x900x24".to_string(),
            args: vec!["-ac".to_string()],
            pidfile: PathBuf::from("/tmp/xvfb.pid"),
        };
        assert_eq!(spec.argv(), vec![":99", "-screen", "0", "1400x900x24", "-ac"]);
    }

    #[test]
    fn actions_serialize_with_kind_tag() {
        let action = Action::CreateDir {
            label: "create data dir".to_string(),
            path: PathBuf::from("/data"),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "create_dir");
        assert_eq!(action.kind(), "create_dir");
        assert_eq!(action.label(), "create data dir");
    }
}
