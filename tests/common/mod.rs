#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use devdocs::action::Action;
use devdocs::config::PipelineConfig;
use devdocs::executor::{ActionExecutor, ActionResult, LocalExecutor};
use devdocs::{Error, Result};

/// Records every action. Filesystem actions run for real; commands,
/// downloads and the display server are faked.
pub struct RecordingExecutor {
    pub actions: RefCell<Vec<Action>>,
    pub env: RefCell<Vec<(String, String)>>,
    fail_on: Option<String>,
    local: LocalExecutor,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            actions: RefCell::new(Vec::new()),
            env: RefCell::new(Vec::new()),
            fail_on: None,
            local: LocalExecutor::default(),
        }
    }

    /// Fail the action with this label.
    pub fn failing_on(label: &str) -> Self {
        Self {
            fail_on: Some(label.to_string()),
            ..Self::new()
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.actions
            .borrow()
            .iter()
            .map(|a| a.label().to_string())
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|a| a.command_line().map(str::to_string))
            .collect()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&self, action: &Action, env: &[(String, String)]) -> Result<ActionResult> {
        self.actions.borrow_mut().push(action.clone());
        *self.env.borrow_mut() = env.to_vec();

        if self.fail_on.as_deref() == Some(action.label()) {
            return Err(Error::internal_unexpected(format!(
                "{} failed",
                action.label()
            )));
        }

        match action {
            Action::CreateDir { .. } | Action::CopyTree { .. } | Action::MakeExecutable { .. } => {
                self.local.execute(action, env)
            }
            _ => Ok(ActionResult::completed(action, Duration::ZERO)),
        }
    }
}

/// A CI machine laid out under one temp directory.
pub struct Machine {
    pub root: tempfile::TempDir,
}

impl Machine {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("mne-python/doc")).unwrap();
        Self { root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    pub fn workdir(&self) -> PathBuf {
        self.path("mne-python")
    }

    /// Default job with every cache path moved under the temp root.
    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.setup.prefix = self.str("miniconda");
        config.setup.installer_path = self.str("miniconda.sh");
        config.environment.data_dir = self.str("mne_data");
        config.dependencies.checkouts_dir = self.str("src");
        config.deploy.checkout_dir = self.str("mne-tools.github.io");
        config.display.pidfile = self.str("xvfb.pid");
        config.cache_directories = vec![self.str("miniconda"), self.str("mne_data")];
        config
    }

    /// Mark setup, the dataset cache and the output checkout as present.
    pub fn warm_caches(&self) {
        fs::create_dir_all(self.path("miniconda/envs/circleenv/bin")).unwrap();
        fs::create_dir_all(self.path("mne_data")).unwrap();
        fs::create_dir_all(self.path("mne-tools.github.io/dev")).unwrap();
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn str(&self, rel: &str) -> String {
        self.path(rel).to_string_lossy().to_string()
    }
}
