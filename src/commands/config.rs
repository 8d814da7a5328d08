use clap::{Args, Subcommand};
use serde::Serialize;

use devdocs::config::{self, PipelineConfig};

use super::{CmdResult, SourceArgs};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display the effective configuration (file merged over built-in defaults)
    Show {
        /// Show only built-in defaults (ignore devdocs.yml)
        #[arg(long)]
        builtin: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show the path to devdocs.yml
    Path {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write the built-in defaults to devdocs.yml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PipelineConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<bool>,
}

impl ConfigOutput {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            config: None,
            path: None,
            exists: None,
            written: None,
        }
    }
}

pub fn run(args: ConfigArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin, source } => show(builtin, &source),
        ConfigCommand::Path { source } => path(&source),
        ConfigCommand::Init { force, source } => init(force, &source),
    }
}

fn show(builtin: bool, source: &SourceArgs) -> CmdResult<ConfigOutput> {
    let config = if builtin {
        PipelineConfig::default()
    } else {
        super::load_config(source)?.config
    };

    Ok((
        ConfigOutput {
            config: Some(config),
            ..ConfigOutput::new("config.show")
        },
        0,
    ))
}

fn path(source: &SourceArgs) -> CmdResult<ConfigOutput> {
    let (_, config_path) = super::locate(source)?;

    Ok((
        ConfigOutput {
            path: Some(config_path.to_string_lossy().to_string()),
            exists: Some(config_path.exists()),
            ..ConfigOutput::new("config.path")
        },
        0,
    ))
}

fn init(force: bool, source: &SourceArgs) -> CmdResult<ConfigOutput> {
    let (_, path) = super::locate(source)?;
    config::save(&PipelineConfig::default(), &path, force)?;

    Ok((
        ConfigOutput {
            path: Some(path.to_string_lossy().to_string()),
            exists: Some(true),
            written: Some(true),
            ..ConfigOutput::new("config.init")
        },
        0,
    ))
}
