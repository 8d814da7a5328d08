use clap::Args;
use serde::Serialize;

use devdocs::phases::PhasePlan;
use devdocs::runner::{self, RunReport};
use devdocs::LocalExecutor;

use super::{CmdResult, PipelineArgs};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Return the phase plans without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
pub struct RunOutput {
    pub command: &'static str,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plans: Option<Vec<PhasePlan>>,
}

pub fn run(args: RunArgs) -> CmdResult<RunOutput> {
    let (loaded, ctx) = super::load_context(&args.pipeline)?;

    if args.dry_run {
        let plans = runner::plan_all(&loaded.config, &ctx)?;
        return Ok((
            RunOutput {
                command: "run",
                dry_run: true,
                report: None,
                plans: Some(plans),
            },
            0,
        ));
    }

    let executor = LocalExecutor::new(crate::tty::is_stderr_tty());
    let report = runner::run_pipeline(&loaded.config, &ctx, &executor, None)?;
    let exit_code = if report.succeeded() { 0 } else { 1 };

    Ok((
        RunOutput {
            command: "run",
            dry_run: false,
            report: Some(report),
            plans: None,
        },
        exit_code,
    ))
}
