use clap::Args;
use std::env;
use std::path::{Path, PathBuf};

use devdocs::config::PipelineConfig;
use devdocs::context::RunContext;
use devdocs::paths;

pub type CmdResult<T> = devdocs::Result<(T, i32)>;

/// Where the pipeline runs and which config it reads.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Config file (default: ./devdocs.yml)
    #[arg(long, env = "DEVDOCS_CONFIG", value_name = "PATH")]
    pub config: Option<String>,

    /// Project checkout to build (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,
}

/// Source arguments plus the branch under build.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Branch being built; only the primary branch fetches datasets and deploys
    #[arg(long, env = "CIRCLE_BRANCH")]
    pub branch: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Loaded configuration with the file it came from.
pub struct Loaded {
    pub config: PipelineConfig,
    pub config_path: PathBuf,
    pub workdir: PathBuf,
}

fn resolve_workdir(workdir: Option<&Path>) -> devdocs::Result<PathBuf> {
    let cwd = env::current_dir().map_err(|e| {
        devdocs::Error::internal_io(e.to_string(), Some("read current directory".to_string()))
    })?;
    Ok(match workdir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Working directory and config file path, without reading the file.
pub fn locate(args: &SourceArgs) -> devdocs::Result<(PathBuf, PathBuf)> {
    let workdir = resolve_workdir(args.workdir.as_deref())?;
    let config_path = paths::config_file(args.config.as_deref(), &workdir)?;
    Ok((workdir, config_path))
}

pub fn load_config(args: &SourceArgs) -> devdocs::Result<Loaded> {
    let (workdir, config_path) = locate(args)?;
    let config = devdocs::config::load(&config_path)?;
    tracing::debug!(path = %config_path.display(), exists = config_path.exists(), "config loaded");
    Ok(Loaded {
        config,
        config_path,
        workdir,
    })
}

pub fn load_context(args: &PipelineArgs) -> devdocs::Result<(Loaded, RunContext)> {
    let loaded = load_config(&args.source)?;
    let branch = args.branch.as_deref().unwrap_or_default();
    let ctx = RunContext::new(&loaded.config, branch, &loaded.workdir)?;
    Ok((loaded, ctx))
}

pub mod cache;
pub mod config;
pub mod phase;
pub mod plan;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (devdocs::Result<serde_json::Value>, i32) {
    crate::tty::status("devdocs is working...");

    match command {
        crate::Commands::Run(args) => dispatch!(args, run),
        crate::Commands::Plan(args) => dispatch!(args, plan),
        crate::Commands::Phase(args) => dispatch!(args, phase),
        crate::Commands::Config(args) => dispatch!(args, config),
        crate::Commands::Cache(args) => dispatch!(args, cache),
    }
}
