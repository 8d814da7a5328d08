use clap::Args;
use serde::Serialize;

use devdocs::runner::{self, RunReport};
use devdocs::{LocalExecutor, Phase};

use super::{CmdResult, PipelineArgs};

#[derive(Args)]
pub struct PhaseArgs {
    /// Phase to run: setup, install, build or deploy
    pub phase: String,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Serialize)]
pub struct PhaseOutput {
    pub command: &'static str,
    pub phase: Phase,
    pub report: RunReport,
}

pub fn run(args: PhaseArgs) -> CmdResult<PhaseOutput> {
    let phase: Phase = args.phase.parse()?;
    let (loaded, ctx) = super::load_context(&args.pipeline)?;

    let executor = LocalExecutor::new(crate::tty::is_stderr_tty());
    let report = runner::run_pipeline(&loaded.config, &ctx, &executor, Some(phase))?;
    let exit_code = if report.succeeded() { 0 } else { 1 };

    Ok((
        PhaseOutput {
            command: "phase",
            phase,
            report,
        },
        exit_code,
    ))
}
