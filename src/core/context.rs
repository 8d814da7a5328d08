//! Per-invocation context: branch, working directory, resolved layout and
//! the environment injected into child commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::paths;

/// Filesystem locations of one pipeline run, with `~` and `$VAR` expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Project checkout the pipeline builds.
    pub workdir: PathBuf,
    /// Python distribution prefix; its existence marks setup as done.
    pub prefix: PathBuf,
    /// Named environment inside the prefix.
    pub env_dir: PathBuf,
    pub installer_path: PathBuf,
    pub data_dir: PathBuf,
    pub checkouts_dir: PathBuf,
    pub doc_dir: PathBuf,
    pub deploy_checkout: PathBuf,
    pub deploy_source: PathBuf,
    pub deploy_target: PathBuf,
    pub display_pidfile: PathBuf,
}

impl Layout {
    pub fn resolve(config: &PipelineConfig, workdir: &Path) -> Result<Self> {
        let prefix = paths::resolve(workdir, &config.setup.prefix)?;
        let env_dir = prefix.join("envs").join(&config.setup.env_name);
        let deploy_checkout = paths::resolve(workdir, &config.deploy.checkout_dir)?;
        let deploy_target = deploy_checkout.join(&config.deploy.target_subdir);

        Ok(Self {
            workdir: workdir.to_path_buf(),
            prefix,
            env_dir,
            installer_path: paths::resolve(workdir, &config.setup.installer_path)?,
            data_dir: paths::resolve(workdir, &config.environment.data_dir)?,
            checkouts_dir: paths::resolve(workdir, &config.dependencies.checkouts_dir)?,
            doc_dir: paths::resolve(workdir, &config.docs.doc_dir)?,
            deploy_checkout,
            deploy_source: paths::resolve(workdir, &config.deploy.source_dir)?,
            deploy_target,
            display_pidfile: paths::resolve(workdir, &config.display.pidfile)?,
        })
    }

    /// `bin` directories prepended to PATH, environment first.
    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        vec![self.env_dir.join("bin"), self.prefix.join("bin")]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    pub run_id: Uuid,
    pub branch: String,
    pub primary_branch: String,
    pub started_at: DateTime<Utc>,
    pub layout: Layout,
    #[serde(skip)]
    env: Vec<(String, String)>,
}

impl RunContext {
    pub fn new(config: &PipelineConfig, branch: &str, workdir: &Path) -> Result<Self> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(Error::validation_missing_argument(vec!["branch".to_string()])
                .with_hint("Pass --branch or set CIRCLE_BRANCH"));
        }

        let layout = Layout::resolve(config, workdir)?;
        let base_path = env::var("PATH").unwrap_or_default();
        let env = build_env(config, &layout, &base_path)?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            branch: branch.to_string(),
            primary_branch: config.primary_branch.clone(),
            started_at: Utc::now(),
            layout,
            env,
        })
    }

    /// The single gating predicate for primary-only work.
    pub fn is_primary(&self) -> bool {
        self.branch == self.primary_branch
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Variables injected into every child: PATH (prepended), the data dir
/// variable, DISPLAY, then any configured extras.
pub fn build_env(
    config: &PipelineConfig,
    layout: &Layout,
    base_path: &str,
) -> Result<Vec<(String, String)>> {
    let mut path_entries: Vec<PathBuf> = layout.bin_dirs();
    for extra in &config.environment.extra_path {
        path_entries.push(paths::resolve(&layout.workdir, extra)?);
    }
    path_entries.extend(env::split_paths(base_path));

    let joined = env::join_paths(path_entries)
        .map_err(|e| Error::config_invalid_value("environment.extra_path", None, e.to_string()))?;

    let mut vars = vec![
        ("PATH".to_string(), joined.to_string_lossy().to_string()),
        (
            config.environment.data_dir_var.clone(),
            paths::display(&layout.data_dir),
        ),
        ("DISPLAY".to_string(), config.display.display_var()),
    ];

    for (key, value) in &config.environment.vars {
        vars.retain(|(k, _)| k != key);
        vars.push((key.clone(), value.clone()));
    }

    Ok(vars)
}
