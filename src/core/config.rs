//! Pipeline configuration.
//!
//! Every field carries a serde default so an empty or partial `devdocs.yml`
//! yields the stock documentation job. A missing file means built-in defaults.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;
use crate::utils::template::{self, TemplateVars};

/// Root configuration structure for devdocs.yml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_primary_branch")]
    pub primary_branch: String,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub setup: SetupConfig,

    #[serde(default)]
    pub dependencies: DependenciesConfig,

    #[serde(default)]
    pub datasets: DatasetsConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub docs: DocsConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default = "default_cache_directories")]
    pub cache_directories: Vec<String>,

    #[serde(default = "default_artifacts")]
    pub artifacts: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_branch: default_primary_branch(),
            environment: EnvironmentConfig::default(),
            setup: SetupConfig::default(),
            dependencies: DependenciesConfig::default(),
            datasets: DatasetsConfig::default(),
            display: DisplayConfig::default(),
            docs: DocsConfig::default(),
            deploy: DeployConfig::default(),
            cache_directories: default_cache_directories(),
            artifacts: default_artifacts(),
        }
    }
}

/// Variables injected into every child command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Name of the variable pointing at the dataset cache.
    #[serde(default = "default_data_dir_var")]
    pub data_dir_var: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Extra directories prepended to PATH after the environment's own bin dirs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_path: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            data_dir_var: default_data_dir_var(),
            data_dir: default_data_dir(),
            extra_path: Vec::new(),
            vars: BTreeMap::new(),
        }
    }
}

/// Python distribution provisioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Install prefix. Its existence marks setup as done.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_installer_url")]
    pub installer_url: String,

    #[serde(default = "default_installer_path")]
    pub installer_path: String,

    #[serde(default = "default_env_name")]
    pub env_name: String,

    #[serde(default = "default_python_version")]
    pub python_version: String,

    #[serde(default = "default_env_packages")]
    pub packages: Vec<String>,

    #[serde(default = "default_true")]
    pub update_manager: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            installer_url: default_installer_url(),
            installer_path: default_installer_path(),
            env_name: default_env_name(),
            python_version: default_python_version(),
            packages: default_env_packages(),
            update_manager: true,
        }
    }
}

/// A package installed from a source checkout in development mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePackage {
    pub name: String,
    pub url: String,
    /// Requirements file installed before the package itself, relative to the checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Directory the source packages are checked out into.
    #[serde(default = "default_checkouts_dir")]
    pub checkouts_dir: String,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourcePackage>,

    #[serde(default = "default_pip_packages")]
    pub pip_packages: Vec<String>,

    /// Install the project under build in development mode as well.
    #[serde(default = "default_true")]
    pub develop_project: bool,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            checkouts_dir: default_checkouts_dir(),
            sources: default_sources(),
            pip_packages: default_pip_packages(),
            develop_project: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetsConfig {
    #[serde(default = "default_dataset_names")]
    pub names: Vec<String>,

    /// Command template; `{{dataset}}` is replaced by each name.
    #[serde(default = "default_fetch_template")]
    pub fetch_template: String,

    #[serde(default = "default_diagnostics")]
    pub diagnostics: Option<String>,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            names: default_dataset_names(),
            fetch_template: default_fetch_template(),
            diagnostics: default_diagnostics(),
        }
    }
}

/// Virtual display server used for headless rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_display_program")]
    pub program: String,

    /// Display identifier, e.g. `:99`.
    #[serde(default = "default_display_id")]
    pub id: String,

    #[serde(default = "default_display_screen")]
    pub screen: String,

    #[serde(default = "default_display_args")]
    pub args: Vec<String>,

    #[serde(default = "default_display_pidfile")]
    pub pidfile: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_display_program(),
            id: default_display_id(),
            screen: default_display_screen(),
            args: default_display_args(),
            pidfile: default_display_pidfile(),
        }
    }
}

impl DisplayConfig {
    /// Value exported as `DISPLAY` (screen 0 of the configured display).
    pub fn display_var(&self) -> String {
        format!("{}.0", self.id)
    }
}

/// What a timeout on a guarded command means for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// The command fails and the phase aborts.
    #[default]
    Fail,
    /// The command is killed, a warning is recorded, and the phase continues.
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_make")]
    pub make: String,

    #[serde(default = "default_doc_dir")]
    pub doc_dir: String,

    /// Built from the project root on the primary branch.
    #[serde(default = "default_full_target")]
    pub full_target: String,

    /// Built from `doc_dir` on every other branch.
    #[serde(default = "default_dev_target")]
    pub dev_target: String,

    /// Built from `doc_dir` on the primary branch, under `extended_timeout_secs`.
    #[serde(default = "default_extended_target")]
    pub extended_target: String,

    #[serde(default = "default_extended_timeout_secs")]
    pub extended_timeout_secs: u64,

    #[serde(default)]
    pub on_timeout: TimeoutPolicy,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            make: default_make(),
            doc_dir: default_doc_dir(),
            full_target: default_full_target(),
            dev_target: default_dev_target(),
            extended_target: default_extended_target(),
            extended_timeout_secs: default_extended_timeout_secs(),
            on_timeout: TimeoutPolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_deploy_repo_url")]
    pub repo_url: String,

    #[serde(default = "default_deploy_checkout_dir")]
    pub checkout_dir: String,

    #[serde(default = "default_primary_branch")]
    pub branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Build output copied into the checkout.
    #[serde(default = "default_deploy_source_dir")]
    pub source_dir: String,

    #[serde(default = "default_deploy_target_subdir")]
    pub target_subdir: String,

    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default = "default_user_email")]
    pub user_email: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            repo_url: default_deploy_repo_url(),
            checkout_dir: default_deploy_checkout_dir(),
            branch: default_primary_branch(),
            remote: default_remote(),
            source_dir: default_deploy_source_dir(),
            target_subdir: default_deploy_target_subdir(),
            user_name: default_user_name(),
            user_email: default_user_email(),
            commit_message: default_commit_message(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_primary_branch() -> String {
    "master".to_string()
}

fn default_data_dir_var() -> String {
    "MNE_DATA".to_string()
}

fn default_data_dir() -> String {
    "~/mne_data".to_string()
}

fn default_prefix() -> String {
    "~/miniconda".to_string()
}

fn default_installer_url() -> String {
    "http://repo.continuum.io/miniconda/Miniconda-latest-Linux-x86_64.sh".to_string()
}

fn default_installer_path() -> String {
    "~/miniconda.sh".to_string()
}

fn default_env_name() -> String {
    "circleenv".to_string()
}

fn default_python_version() -> String {
    "2.7".to_string()
}

fn default_env_packages() -> Vec<String> {
    [
        "pip",
        "numpy",
        "scipy",
        "scikit-learn",
        "mayavi",
        "matplotlib",
        "sphinx",
        "pillow",
        "six",
        "ipython",
        "pandas",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_checkouts_dir() -> String {
    "~".to_string()
}

fn default_sources() -> Vec<SourcePackage> {
    vec![
        SourcePackage {
            name: "sphinx-gallery".to_string(),
            url: "https://github.com/sphinx-gallery/sphinx-gallery.git".to_string(),
            requirements: Some("requirements.txt".to_string()),
        },
        SourcePackage {
            name: "pyface".to_string(),
            url: "https://github.com/enthought/pyface.git".to_string(),
            requirements: None,
        },
    ]
}

fn default_pip_packages() -> Vec<String> {
    ["sphinx_bootstrap_theme", "PySurfer", "nilearn", "neo"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_dataset_names() -> Vec<String> {
    [
        "sample",
        "testing",
        "misc",
        "spm_face",
        "somato",
        "brainstorm.bst_raw",
        "brainstorm.bst_resting",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_fetch_template() -> String {
    "python -c \"import mne; mne.datasets.{{dataset}}.data_path(verbose=True)\"".to_string()
}

fn default_diagnostics() -> Option<String> {
    Some("python -c \"import mne; mne.sys_info()\"".to_string())
}

fn default_display_program() -> String {
    "/usr/bin/Xvfb".to_string()
}

fn default_display_id() -> String {
    ":99".to_string()
}

fn default_display_screen() -> String {
    "1400x900x24".to_string()
}

fn default_display_args() -> Vec<String> {
    ["-ac", "+extension", "GLX", "+render", "-noreset"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_display_pidfile() -> String {
    "/tmp/custom_xvfb_99.pid".to_string()
}

fn default_make() -> String {
    "make".to_string()
}

fn default_doc_dir() -> String {
    "doc".to_string()
}

fn default_full_target() -> String {
    "test-doc".to_string()
}

fn default_dev_target() -> String {
    "html_dev-noplot".to_string()
}

fn default_extended_target() -> String {
    "html_dev".to_string()
}

fn default_extended_timeout_secs() -> u64 {
    1500
}

fn default_deploy_repo_url() -> String {
    "https://github.com/mne-tools/mne-tools.github.io.git".to_string()
}

fn default_deploy_checkout_dir() -> String {
    "~/mne-tools.github.io".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_deploy_source_dir() -> String {
    "doc/_build/html".to_string()
}

fn default_deploy_target_subdir() -> String {
    "dev".to_string()
}

fn default_user_name() -> String {
    "Circle Ci".to_string()
}

fn default_user_email() -> String {
    "circle@mne.com".to_string()
}

fn default_commit_message() -> String {
    "Automated update of dev docs.".to_string()
}

fn default_cache_directories() -> Vec<String> {
    ["~/miniconda", "~/.mne", "~/mne_data", "~/mne-tools.github.io"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_artifacts() -> Vec<String> {
    vec!["doc/_build/html".to_string()]
}

// =============================================================================
// Validation
// =============================================================================

// Characters `git check-ref-format` refuses anywhere in a ref name.
static REF_NAME_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x20\x7f~^:?*\[\\]|\.\.|@\{|//").unwrap());

static DATASET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)*$").unwrap());

/// Check a branch or remote name with the rules of `git check-ref-format --branch`.
pub fn validate_ref_name(field: &str, value: &str) -> Result<()> {
    let malformed = value.is_empty()
        || value == "@"
        || value.starts_with(['-', '/', '.'])
        || value.ends_with(['/', '.'])
        || value.ends_with(".lock")
        || value.contains("/.")
        || REF_NAME_FORBIDDEN.is_match(value);
    if malformed {
        return Err(Error::validation_invalid_argument(
            field,
            format!("'{}' is not a valid git ref name", value),
            Some(value.to_string()),
            None,
        ));
    }
    Ok(())
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        validate_ref_name("primary_branch", &self.primary_branch)
            .map_err(|_| invalid("primary_branch", &self.primary_branch, "not a valid ref name"))?;
        validate_ref_name("deploy.branch", &self.deploy.branch)
            .map_err(|_| invalid("deploy.branch", &self.deploy.branch, "not a valid ref name"))?;
        validate_ref_name("deploy.remote", &self.deploy.remote)
            .map_err(|_| invalid("deploy.remote", &self.deploy.remote, "not a valid ref name"))?;

        for name in &self.datasets.names {
            if !DATASET_PATTERN.is_match(name) {
                return Err(invalid("datasets.names", name, "not a dotted module path"));
            }
        }
        if !self.datasets.names.is_empty()
            && !template::is_present(&self.datasets.fetch_template, TemplateVars::DATASET)
        {
            return Err(invalid(
                "datasets.fetch_template",
                &self.datasets.fetch_template,
                "must contain the {{dataset}} placeholder",
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.dependencies.sources {
            if source.name.trim().is_empty() || source.name.contains('/') {
                return Err(invalid(
                    "dependencies.sources.name",
                    &source.name,
                    "must be a plain directory name",
                ));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(invalid(
                    "dependencies.sources.name",
                    &source.name,
                    "duplicate source package",
                ));
            }
        }

        if self.docs.extended_timeout_secs == 0 {
            return Err(invalid(
                "docs.extended_timeout_secs",
                "0",
                "timeout must be greater than zero",
            ));
        }

        if self.setup.env_name.trim().is_empty() {
            return Err(Error::config_missing_key("setup.env_name", None));
        }
        if self.deploy.commit_message.trim().is_empty() {
            return Err(Error::config_missing_key("deploy.commit_message", None));
        }

        Ok(())
    }
}

fn invalid(key: &str, value: &str, problem: &str) -> Error {
    Error::config_invalid_value(key, Some(value.to_string()), problem)
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load config from `path`, falling back to built-in defaults when the file is absent.
pub fn load(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file absent, using defaults");
        return Ok(PipelineConfig::default());
    }

    let content = io::read_file(path, &format!("read {}", path.display()))?;

    let config = parse(&content, path)?;
    config.validate()?;
    Ok(config)
}

/// Parse config text; `.json` files are read as JSON, everything else as YAML.
pub fn parse(content: &str, path: &Path) -> Result<PipelineConfig> {
    let display = paths::display(path);

    if is_json_path(path) {
        return serde_json::from_str(content).map_err(|e| Error::config_invalid_json(display, e));
    }

    if content.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }

    serde_yml::from_str(content).map_err(|e| Error::config_invalid_yaml(display, e))
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

pub fn to_yaml(config: &PipelineConfig) -> Result<String> {
    serde_yml::to_string(config)
        .map_err(|e| Error::internal_unexpected(format!("serialize config: {}", e)))
}

/// Write config as YAML. Refuses to overwrite unless `force` is set.
pub fn save(config: &PipelineConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::validation_invalid_argument(
            "path",
            format!("{} already exists", path.display()),
            None,
            None,
        )
        .with_hint("Pass --force to overwrite it"));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        io::ensure_dir(parent)?;
    }

    let content = if is_json_path(path) {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize config".to_string())))?
    } else {
        to_yaml(config)?
    };
    io::write_file_atomic(path, &content, &format!("write {}", path.display()))
}
