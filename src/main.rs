use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod tty;

use commands::{cache, config, phase, plan, run};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "DEVDOCS_LOG";

#[derive(Parser)]
#[command(name = "devdocs")]
#[command(version = VERSION)]
#[command(about = "Build the development documentation and publish it from CI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all four phases: setup, install, build, deploy
    Run(run::RunArgs),
    /// Show the actions each phase would execute for a branch
    Plan(plan::PlanArgs),
    /// Run a single phase on its own
    Phase(phase::PhaseArgs),
    /// Inspect or initialize devdocs.yml
    Config(config::ConfigArgs),
    /// Report which cache directories exist
    Cache(cache::CacheArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let (json_result, exit_code) = commands::run_json(cli.command);
    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err.message);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
